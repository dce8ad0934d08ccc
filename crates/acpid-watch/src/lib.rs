//! # acpid event engine
//!
//! Reads hardware events, classifies them against the mapping tables and
//! launches the matching handler.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │    SourceSet    │───▶│  CanonicalEvent  │───▶│     resolve     │
//! │ (poll, decode)  │    │ (binary | text)  │    │ (event → action)│
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//!                                                         │
//!                                                         ▼
//!                                                ┌─────────────────┐
//!                                                │   Dispatcher    │
//!                                                │ (file | run-parts)
//!                                                └─────────────────┘
//! ```
//!
//! Everything runs on the caller's thread. The only blocking call is
//! [`SourceSet::wait_ready`]; handlers run as detached child processes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
mod events;
pub mod handlers;
mod resolver;
mod sources;
pub mod traits;

pub use error::*;
pub use events::*;
pub use handlers::{classify, run_parts, BatchRunner, Dispatcher, Invocation, ProcessSpawner, RunPartsReport};
pub use resolver::*;
pub use sources::*;
pub use traits::{ActionHandler, EventSource, Spawner};

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::{
        resolve, ActionHandler, CanonicalEvent, Dispatcher, Error, EventSource, RawInputEvent,
        Result, SourceSet, Spawner, WaitError,
    };
    pub use acpid_config::{MappingTables, SourceSpec};
}
