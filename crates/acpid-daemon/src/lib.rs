//! acpid daemon shell
//!
//! Command-line parsing, logging setup, process lifecycle and the event
//! loop that ties [`acpid_watch`] sources to handler dispatch.

pub mod cli;
pub mod daemon;
pub mod lifecycle;
pub mod logging;

pub use cli::{Cli, Commands};
pub use daemon::{run_event_loop, Daemon, LoopExit, StartupError};
pub use logging::{init_logging, LogTarget};
