//! # acpid configuration
//!
//! Everything the daemon reads once at startup and never mutates afterward:
//!
//! - the **event map** (`/etc/acpi.map`), which turns a raw input event or a
//!   legacy `/proc/acpi/event` line into a human-readable description,
//! - the **action table** (`/etc/acpid.conf`), which turns a description into
//!   a handler path relative to the configuration directory,
//! - the daemon settings ([`DaemonConfig`]), loaded from an optional TOML file.
//!
//! Both table files use the same whitespace-delimited format with `#`
//! comments. When a table file cannot be opened, the built-in defaults are
//! used as a whole; they are never merged with partial file content.
//!
//! ```rust,no_run
//! use acpid_config::{load_action_table, load_event_table, MappingTables};
//!
//! let tables = MappingTables::new(
//!     load_event_table("/etc/acpi.map"),
//!     load_action_table("/etc/acpid.conf"),
//! );
//! assert!(!tables.events().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod daemon;
mod error;
mod loader;
mod tables;

pub use daemon::*;
pub use error::*;
pub use loader::*;
pub use tables::*;
