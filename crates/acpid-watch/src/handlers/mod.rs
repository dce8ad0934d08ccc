//! Handler dispatch.
//!
//! A resolved action path names either a program or a directory of
//! programs under the handler root. Programs are started directly;
//! directories go through a run-parts runner. Nothing waits for them.

mod runner;

pub use runner::{is_valid_part_name, list_parts, run_parts, RunPartsReport};

use runner::spawn_retrying_busy;

use crate::traits::{ActionHandler, Spawner};
use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// How an existing handler path is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Run the file itself.
    Direct(PathBuf),
    /// Run every executable in the directory, in name order.
    Batch(PathBuf),
}

impl Invocation {
    /// The handler path.
    pub fn path(&self) -> &Path {
        match self {
            Self::Direct(path) | Self::Batch(path) => path,
        }
    }
}

/// Decide how to start `action` under `root`.
///
/// Errors when the path does not exist or cannot be inspected.
pub fn classify(root: &Path, action: &str) -> io::Result<Invocation> {
    let path = root.join(action);
    let metadata = std::fs::metadata(&path)?;
    Ok(if metadata.is_dir() {
        Invocation::Batch(path)
    } else {
        Invocation::Direct(path)
    })
}

/// Program used for directory handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchRunner {
    /// Re-run this executable as `<exe> run-parts <dir>`.
    Builtin(PathBuf),
    /// An external program called as `<program> <dir>`.
    External(PathBuf),
}

impl BatchRunner {
    /// Subcommand the daemon binary answers to for [`BatchRunner::Builtin`].
    pub const SUBCOMMAND: &'static str = "run-parts";

    /// Use the running executable's own run-parts subcommand.
    pub fn builtin() -> io::Result<Self> {
        Ok(Self::Builtin(std::env::current_exe()?))
    }

    fn command(&self, dir: &Path) -> Command {
        match self {
            Self::Builtin(exe) => {
                let mut cmd = Command::new(exe);
                cmd.arg(Self::SUBCOMMAND).arg(dir);
                cmd
            }
            Self::External(program) => {
                let mut cmd = Command::new(program);
                cmd.arg(dir);
                cmd
            }
        }
    }
}

/// Starts handlers as detached child processes.
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    batch: BatchRunner,
}

impl ProcessSpawner {
    /// Create a spawner that hands directories to `batch`.
    pub fn new(batch: BatchRunner) -> Self {
        Self { batch }
    }
}

impl Spawner for ProcessSpawner {
    fn spawn(&self, invocation: &Invocation, cwd: &Path) -> io::Result<()> {
        let mut cmd = match invocation {
            Invocation::Direct(path) => Command::new(path),
            Invocation::Batch(dir) => self.batch.command(dir),
        };
        cmd.current_dir(cwd);
        restore_child_signals(&mut cmd);

        // The handle is dropped unwaited; the daemon ignores SIGCHLD.
        let child = spawn_retrying_busy(&mut cmd)?;
        debug!(pid = child.id(), "Started {}", invocation.path().display());
        Ok(())
    }
}

// The daemon ignores SIGCHLD and blocks its terminal signals outside the
// wait; both survive exec. Handlers start with the default SIGCHLD
// disposition and an empty signal mask.
#[allow(unsafe_code)]
fn restore_child_signals(cmd: &mut Command) {
    // SAFETY: signal(2), sigemptyset(3) and sigprocmask(2) are async-signal-safe
    // and touch no parent state.
    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGCHLD, libc::SIG_DFL);
            let mut empty: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut empty);
            libc::sigprocmask(libc::SIG_SETMASK, &empty, std::ptr::null_mut());
            Ok(())
        });
    }
}

/// Turns resolved action paths into running handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher<S = ProcessSpawner> {
    root: PathBuf,
    spawner: S,
}

impl<S: Spawner> Dispatcher<S> {
    /// Create a dispatcher for handlers under `root`.
    pub fn new(root: impl Into<PathBuf>, spawner: S) -> Self {
        Self {
            root: root.into(),
            spawner,
        }
    }

    /// The spawner in use.
    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Start the handler for `action_path`.
    ///
    /// Missing handlers and spawn failures are logged and swallowed.
    pub fn dispatch(&self, action_path: &str) {
        let invocation = match classify(&self.root, action_path) {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!("{}: {}", action_path, e);
                return;
            }
        };

        if let Err(e) = self.spawner.spawn(&invocation, &self.root) {
            warn!(
                "Failed to start handler {}: {}",
                invocation.path().display(),
                e
            );
        }
    }
}

impl<S: Spawner> ActionHandler for Dispatcher<S> {
    fn handle(&self, action_path: &str) {
        self.dispatch(action_path);
    }
}
