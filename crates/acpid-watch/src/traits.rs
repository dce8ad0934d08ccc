//! Seams between the event loop and the outside world.

use crate::error::WaitError;
use crate::events::CanonicalEvent;
use crate::handlers::Invocation;
use std::io;
use std::path::Path;

/// Receives resolved action paths.
///
/// Handling is one-way: nothing is returned and failures stay inside the
/// implementation.
pub trait ActionHandler {
    /// Act on a resolved action path.
    fn handle(&self, action_path: &str);
}

/// Starts handler processes.
pub trait Spawner {
    /// Start `invocation` with `cwd` as its working directory.
    ///
    /// Returns once the process is started; it is never waited on.
    fn spawn(&self, invocation: &Invocation, cwd: &Path) -> io::Result<()>;
}

/// Inputs the event loop waits on.
pub trait EventSource {
    /// Block until at least one input is readable and return the readable
    /// indices in order.
    fn wait_ready(&mut self) -> Result<Vec<usize>, WaitError>;

    /// Make one decode attempt on input `index`.
    fn read_event(&mut self, index: usize) -> Option<CanonicalEvent>;
}
