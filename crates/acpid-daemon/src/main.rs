// acpid - ACPI and input event daemon
//
// Watches /dev/input/event* (or a legacy /proc/acpi/event file), maps each
// event to a handler under the configuration directory and starts it.

use acpid_config::DaemonConfig;
use acpid_daemon::{
    init_logging, lifecycle, Cli, Commands, Daemon, LogTarget, LoopExit, StartupError,
};
use acpid_watch::run_parts;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process;
use tracing::{error, info, warn};

/// Exit codes for different scenarios
mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 1;
    pub const SOURCE_ERROR: i32 = 2;
    pub const OTHER_ERROR: i32 = 4;
}

fn main() {
    let cli = Cli::parse();

    if let Some(Commands::RunParts { dir }) = &cli.command {
        process::exit(run_parts_command(dir));
    }

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("acpid: {:#}", e);
            process::exit(exit_codes::CONFIG_ERROR);
        }
    };

    if !cli.stays_in_foreground() {
        match lifecycle::spawn_background(&config.log_file) {
            Ok(_) => process::exit(exit_codes::SUCCESS),
            Err(e) => {
                eprintln!("acpid: {:#}", e);
                process::exit(exit_codes::OTHER_ERROR);
            }
        }
    }

    let target = if cli.debug {
        LogTarget::File(&config.log_file)
    } else {
        LogTarget::Stderr
    };
    if let Err(e) = init_logging(target, cli.debug) {
        eprintln!("acpid: {:#}", e);
        process::exit(exit_codes::CONFIG_ERROR);
    }

    match Daemon::new(config, cli.debug).run() {
        Ok(LoopExit::Signal(_)) | Ok(LoopExit::WaitFailed(_)) => {
            info!("acpid stopped");
            process::exit(exit_codes::SUCCESS);
        }
        Err(e) => {
            error!("{}", e);
            let code = match e {
                StartupError::Sources(_) => exit_codes::SOURCE_ERROR,
                StartupError::ChangeDir { .. } => exit_codes::CONFIG_ERROR,
                StartupError::RunParts(_) | StartupError::Signals(_) => exit_codes::OTHER_ERROR,
            };
            process::exit(code);
        }
    }
}

/// Settings file first, then command-line flags on top.
fn load_configuration(cli: &Cli) -> Result<DaemonConfig> {
    let base = match &cli.config {
        Some(path) => DaemonConfig::load_from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    Ok(cli.apply_to(base))
}

fn run_parts_command(dir: &Path) -> i32 {
    let _ = init_logging(LogTarget::Stderr, false);

    match run_parts(dir) {
        Ok(report) if report.is_success() => exit_codes::SUCCESS,
        Ok(report) => {
            for (part, reason) in &report.failed {
                warn!("{}: {}", part.display(), reason);
            }
            exit_codes::OTHER_ERROR
        }
        Err(e) => {
            error!("{}: {}", dir.display(), e);
            exit_codes::OTHER_ERROR
        }
    }
}
