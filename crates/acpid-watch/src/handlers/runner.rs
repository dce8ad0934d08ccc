//! Built-in run-parts: run every executable in a directory, in name order.

use std::ffi::OsStr;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::time::Duration;
use tracing::{debug, warn};

/// What a run-parts pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunPartsReport {
    /// Parts that exited successfully.
    pub succeeded: Vec<PathBuf>,
    /// Parts that failed to start or exited unsuccessfully, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl RunPartsReport {
    /// Whether every part succeeded.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Names made only of ASCII letters, digits, `_` and `-`.
///
/// Editor backups, `.dpkg-old` files and dotfiles are skipped this way.
pub fn is_valid_part_name(name: &OsStr) -> bool {
    let bytes = name.as_bytes();
    !bytes.is_empty()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
}

/// Executable regular files in `dir` with valid names, sorted by name.
pub fn list_parts(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut parts = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !is_valid_part_name(&entry.file_name()) {
            debug!("Skipping {}: name not allowed", entry.path().display());
            continue;
        }
        let path = entry.path();
        // Follows symlinks, like exec would.
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if metadata.is_file() && metadata.permissions().mode() & 0o111 != 0 {
            parts.push(path);
        }
    }

    parts.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(parts)
}

/// Run every part of `dir` one after another, continuing past failures.
pub fn run_parts(dir: &Path) -> io::Result<RunPartsReport> {
    let mut report = RunPartsReport::default();

    for part in list_parts(dir)? {
        debug!("Running {}", part.display());
        match run_part(&part) {
            Ok(status) if status.success() => report.succeeded.push(part),
            Ok(status) => {
                warn!("{} exited with {}", part.display(), status);
                report.failed.push((part, status.to_string()));
            }
            Err(e) => {
                warn!("{} failed to start: {}", part.display(), e);
                report.failed.push((part, e.to_string()));
            }
        }
    }

    Ok(report)
}

const BUSY_RETRIES: u32 = 3;

/// Spawn `cmd`, retrying briefly while the program is busy (ETXTBSY).
///
/// A script that was just written can still be held open for writing by
/// a concurrently forked process for a moment.
pub(crate) fn spawn_retrying_busy(cmd: &mut Command) -> io::Result<Child> {
    let mut attempt = 0;
    loop {
        match cmd.spawn() {
            Err(e) if e.raw_os_error() == Some(libc::ETXTBSY) && attempt < BUSY_RETRIES => {
                attempt += 1;
                std::thread::sleep(Duration::from_millis(20));
            }
            result => return result,
        }
    }
}

fn run_part(part: &Path) -> io::Result<ExitStatus> {
    spawn_retrying_busy(&mut Command::new(part))?.wait()
}
