use acpid_config::DaemonConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "acpid")]
#[command(about = "Listen to ACPI and input events and spawn handlers")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Handler directory
    #[arg(short = 'c', value_name = "DIR")]
    pub conf_dir: Option<PathBuf>,

    /// Debug: stay in foreground, log every event to the log file
    #[arg(short = 'd')]
    pub debug: bool,

    /// Read text events from FILE instead of input devices
    #[arg(short = 'e', value_name = "FILE")]
    pub proc_event: Option<PathBuf>,

    /// Run in foreground
    #[arg(short = 'f')]
    pub foreground: bool,

    /// Log file
    #[arg(short = 'l', value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Action table
    #[arg(short = 'a', value_name = "FILE")]
    pub action_file: Option<PathBuf>,

    /// Event map
    #[arg(short = 'M', value_name = "FILE")]
    pub map_file: Option<PathBuf>,

    /// PID file
    #[arg(short = 'p', value_name = "FILE")]
    pub pid_file: Option<PathBuf>,

    /// Settings file (TOML); flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    // Accepted for compatibility with other acpid implementations.
    #[arg(short = 'g', value_name = "X", hide = true)]
    pub compat_group: Option<String>,

    #[arg(short = 'm', value_name = "X", hide = true)]
    pub compat_mode: Option<String>,

    #[arg(short = 's', value_name = "X", hide = true)]
    pub compat_socket: Option<String>,

    #[arg(short = 'S', value_name = "X", hide = true)]
    pub compat_socket_group: Option<String>,

    #[arg(short = 'v', hide = true)]
    pub compat_verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every valid executable in DIR, in name order
    #[command(name = "run-parts", hide = true)]
    RunParts {
        /// Directory of handler parts
        dir: PathBuf,
    },
}

impl Cli {
    /// Whether the process should stay attached to its terminal.
    pub fn stays_in_foreground(&self) -> bool {
        self.foreground || self.debug
    }

    /// Overlay command-line flags on `base`.
    pub fn apply_to(&self, mut base: DaemonConfig) -> DaemonConfig {
        if let Some(dir) = &self.conf_dir {
            base.conf_dir = dir.clone();
        }
        if let Some(file) = &self.proc_event {
            base.proc_event = Some(file.clone());
        }
        if let Some(file) = &self.log_file {
            base.log_file = file.clone();
        }
        if let Some(file) = &self.action_file {
            base.action_file = file.clone();
        }
        if let Some(file) = &self.map_file {
            base.map_file = file.clone();
        }
        if let Some(file) = &self.pid_file {
            base.pid_file = file.clone();
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_flags_means_background_with_defaults() {
        let cli = Cli::try_parse_from(["acpid"]).unwrap();
        assert!(!cli.stays_in_foreground());
        assert!(cli.command.is_none());
        assert_eq!(cli.apply_to(DaemonConfig::default()), DaemonConfig::default());
    }

    #[test]
    fn test_debug_implies_foreground() {
        let cli = Cli::try_parse_from(["acpid", "-d"]).unwrap();
        assert!(cli.debug);
        assert!(cli.stays_in_foreground());
    }
}
