//! Daemon settings.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the daemon reads events from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A single legacy text file such as `/proc/acpi/event`.
    Explicit(PathBuf),
    /// Numbered binary devices `<base>0`, `<base>1`, ... probed until one is missing.
    Probe(PathBuf),
}

/// Settings for the daemon process.
///
/// Every field has a default, so a settings file only needs the keys it
/// changes:
///
/// ```toml
/// conf_dir = "/etc/acpi"
/// input = "/dev/input/event"
/// run_parts = "/bin/run-parts"
/// ```
///
/// Unknown keys are a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Handler root; the daemon changes into it at startup.
    pub conf_dir: PathBuf,

    /// Action table file.
    pub action_file: PathBuf,

    /// Event map file.
    pub map_file: PathBuf,

    /// Prefix of the numbered binary input devices.
    pub input: PathBuf,

    /// Legacy text event file. When set, it is the only source.
    pub proc_event: Option<PathBuf>,

    /// Log file for debug and background runs.
    pub log_file: PathBuf,

    /// PID file written once the sources are open.
    pub pid_file: PathBuf,

    /// External run-parts program for directory handlers.
    /// `None` uses the daemon's own runner.
    pub run_parts: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            conf_dir: PathBuf::from("/etc/acpi"),
            action_file: PathBuf::from("/etc/acpid.conf"),
            map_file: PathBuf::from("/etc/acpi.map"),
            input: PathBuf::from("/dev/input/event"),
            proc_event: None,
            log_file: PathBuf::from("/var/log/acpid.log"),
            pid_file: PathBuf::from("/var/run/acpid.pid"),
            run_parts: None,
        }
    }
}

impl DaemonConfig {
    /// Load settings from a TOML file. Missing keys keep their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded daemon settings from {}", path.display());
        Ok(config)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The event sources these settings select.
    pub fn source_spec(&self) -> SourceSpec {
        match &self.proc_event {
            Some(path) => SourceSpec::Explicit(path.clone()),
            None => SourceSpec::Probe(self.input.clone()),
        }
    }
}
