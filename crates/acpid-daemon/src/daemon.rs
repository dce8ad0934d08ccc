//! Startup sequence, event loop and shutdown.

use crate::lifecycle;
use acpid_config::{load_action_table, load_event_table, DaemonConfig, MappingTables};
use acpid_watch::{
    resolve, ActionHandler, BatchRunner, Dispatcher, EventSource, ProcessSpawner, SourceSet,
    WaitError,
};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

/// Fatal startup failures.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Cannot change to handler directory {path}: {source}")]
    ChangeDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot locate the built-in run-parts: {0}")]
    RunParts(#[source] io::Error),

    #[error("Cannot install signal handlers: {0}")]
    Signals(anyhow::Error),

    #[error(transparent)]
    Sources(#[from] acpid_watch::Error),
}

/// Why the event loop returned.
#[derive(Debug)]
pub enum LoopExit {
    /// A terminal signal arrived.
    Signal(i32),
    /// `poll(2)` failed with something other than `EINTR`.
    WaitFailed(io::Error),
}

/// A configured daemon, ready to run.
pub struct Daemon {
    config: DaemonConfig,
    debug: bool,
}

impl Daemon {
    pub fn new(config: DaemonConfig, debug: bool) -> Self {
        Self { config, debug }
    }

    /// Load tables, enter the handler directory, open sources and loop
    /// until a terminal signal.
    pub fn run(self) -> Result<LoopExit, StartupError> {
        let tables = MappingTables::new(
            load_event_table(&self.config.map_file),
            load_action_table(&self.config.action_file),
        );
        debug!("Mapping tables:\n{}", tables);

        std::env::set_current_dir(&self.config.conf_dir).map_err(|source| {
            StartupError::ChangeDir {
                path: self.config.conf_dir.clone(),
                source,
            }
        })?;
        let root = std::env::current_dir().unwrap_or_else(|_| self.config.conf_dir.clone());

        lifecycle::ignore_children().map_err(StartupError::Signals)?;
        lifecycle::install_terminal_handlers().map_err(StartupError::Signals)?;

        let batch = match &self.config.run_parts {
            Some(program) => BatchRunner::External(program.clone()),
            None => BatchRunner::builtin().map_err(StartupError::RunParts)?,
        };
        let dispatcher = Dispatcher::new(root, ProcessSpawner::new(batch));

        let mut sources = SourceSet::open(&self.config.source_spec())?;
        sources
            .deliver_signals_while_waiting(lifecycle::TERMINAL_SIGNALS)
            .map_err(|e| StartupError::Signals(e.into()))?;

        if let Err(e) = lifecycle::write_pid_file(&self.config.pid_file) {
            warn!(
                "Failed to write PID file {}: {}",
                self.config.pid_file.display(),
                e
            );
        }
        info!("acpid v{} started", env!("CARGO_PKG_VERSION"));

        let exit = run_event_loop(
            &mut sources,
            &tables,
            &dispatcher,
            self.debug,
            lifecycle::take_pending_signal,
        );

        sources.close();
        lifecycle::remove_pid_file(&self.config.pid_file);
        Ok(exit)
    }
}

/// Wait, decode, resolve and dispatch until `stop` reports a signal.
///
/// `stop` is consulted before every wait, so also after an interrupted
/// one; an interruption without a pending signal is retried.
pub fn run_event_loop(
    sources: &mut impl EventSource,
    tables: &MappingTables,
    handler: &dyn ActionHandler,
    debug: bool,
    stop: impl Fn() -> Option<i32>,
) -> LoopExit {
    loop {
        if let Some(signo) = stop() {
            info!("Got signal {}, exiting", signo);
            return LoopExit::Signal(signo);
        }

        let ready = match sources.wait_ready() {
            Ok(ready) => ready,
            Err(WaitError::Interrupted) => continue,
            Err(WaitError::Failed(e)) => {
                error!("Waiting for events failed: {}", e);
                return LoopExit::WaitFailed(e);
            }
        };

        for index in ready {
            let Some(event) = sources.read_event(index) else {
                continue;
            };
            match resolve(tables, &event) {
                Some(action) => {
                    if debug {
                        info!("{} -> {}", event, action);
                    }
                    handler.handle(action);
                }
                None => trace!("No action for {}", event),
            }
        }
    }
}
