//! Daemon lifecycle: background mode, PID file, signal policy

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::debug;

/// Signals that end the event loop.
pub const TERMINAL_SIGNALS: &[libc::c_int] = &[
    libc::SIGHUP,
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGPIPE,
    libc::SIGALRM,
    libc::SIGTERM,
    libc::SIGUSR1,
    libc::SIGUSR2,
    libc::SIGXCPU,
    libc::SIGXFSZ,
    libc::SIGVTALRM,
];

static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn record_signal(signo: libc::c_int) {
    PENDING_SIGNAL.store(signo, Ordering::SeqCst);
}

/// Route every terminal signal to a handler that only records it.
///
/// No `SA_RESTART`: a blocked `poll(2)` returns `EINTR` so the loop can exit.
pub fn install_terminal_handlers() -> Result<()> {
    for &signo in TERMINAL_SIGNALS {
        set_disposition(signo, record_signal as extern "C" fn(libc::c_int) as libc::sighandler_t)
            .with_context(|| format!("Failed to install handler for signal {}", signo))?;
    }
    Ok(())
}

/// Let the kernel reap handler processes; they are never waited on.
pub fn ignore_children() -> Result<()> {
    set_disposition(libc::SIGCHLD, libc::SIG_IGN).context("Failed to ignore SIGCHLD")
}

/// Take the last terminal signal received, if any, and clear it.
pub fn take_pending_signal() -> Option<i32> {
    match PENDING_SIGNAL.swap(0, Ordering::SeqCst) {
        0 => None,
        signo => Some(signo),
    }
}

#[allow(unsafe_code)]
fn set_disposition(signo: libc::c_int, handler: libc::sighandler_t) -> std::io::Result<()> {
    // SAFETY: a zeroed sigaction is valid; the handler only performs an atomic store.
    let rc = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(signo, &action, std::ptr::null_mut())
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// Write PID file
pub fn write_pid_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{}\n", std::process::id()))?;
    Ok(())
}

/// Remove PID file
pub fn remove_pid_file(path: &Path) {
    let _ = fs::remove_file(path);
}

/// Re-run this executable in the foreground, detached from the terminal.
///
/// The child gets the same arguments plus `-f`, no stdin, and stdout and
/// stderr appended to `log_file`.
pub fn spawn_background(log_file: &Path) -> Result<u32> {
    let exe = std::env::current_exe().context("Failed to get current executable path")?;

    let mut cmd = Command::new(&exe);
    cmd.args(std::env::args_os().skip(1)).arg("-f");
    cmd.stdin(Stdio::null());

    match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(log) => {
            let err = log.try_clone().context("Failed to duplicate log file handle")?;
            cmd.stdout(log).stderr(err);
        }
        Err(e) => {
            eprintln!("acpid: {}: {}; background output discarded", log_file.display(), e);
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }

    detach_session(&mut cmd);
    let child = cmd.spawn().context("Failed to start background daemon")?;
    debug!("Started background daemon with pid {}", child.id());
    Ok(child.id())
}

#[allow(unsafe_code)]
fn detach_session(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: setsid(2) is async-signal-safe.
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }
}
