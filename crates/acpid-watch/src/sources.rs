//! Event sources and the readiness loop primitive.

use crate::error::{Error, Result, WaitError};
use crate::events::{decode_binary, decode_text, CanonicalEvent, INPUT_EVENT_SIZE};
use crate::traits::EventSource;
use acpid_config::SourceSpec;
use std::ffi::OsString;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Wire format of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Fixed-size `input_event` records.
    Binary,
    /// Newline-terminated `/proc/acpi/event` lines.
    Text,
}

/// One open event source.
#[derive(Debug)]
pub struct SourceHandle {
    file: File,
    kind: SourceKind,
    path: PathBuf,
    enabled: bool,
}

impl SourceHandle {
    /// Open `path` read-only and non-blocking.
    pub fn open(path: &Path, kind: SourceKind) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        Ok(Self::from_file(file, kind, path))
    }

    /// Wrap an already open file.
    pub fn from_file(file: File, kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            file,
            kind,
            path: path.into(),
            enabled: true,
        }
    }

    /// Wire format.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False once the source hung up or hit EOF; it is no longer polled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn disable(&mut self, reason: &str) {
        if self.enabled {
            self.enabled = false;
            warn!("{} {}, no longer listening on it", self.path.display(), reason);
        }
    }

    fn read_event(&mut self) -> Option<CanonicalEvent> {
        match self.kind {
            SourceKind::Binary => {
                let mut buf = vec![0u8; INPUT_EVENT_SIZE];
                let got = match read_full(&mut self.file, &mut buf) {
                    Ok(Some(n)) => n,
                    Ok(None) => {
                        self.disable("reached end of file");
                        return None;
                    }
                    Err(e) => {
                        debug!("Read from {} failed: {}", self.path.display(), e);
                        return None;
                    }
                };
                let raw = match decode_binary(&buf[..got]) {
                    Ok(raw) => raw,
                    Err(e) => {
                        debug!("Dropping event from {}: {}", self.path.display(), e);
                        return None;
                    }
                };
                let event = CanonicalEvent::from_raw(raw);
                if event.is_none() {
                    trace!(
                        "Ignoring non-transition value {} from {}",
                        raw.value,
                        self.path.display()
                    );
                }
                event
            }
            SourceKind::Text => {
                let line = match read_line(&mut self.file) {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        self.disable("reached end of file");
                        return None;
                    }
                    Err(e) => {
                        debug!("Read from {} failed: {}", self.path.display(), e);
                        return None;
                    }
                };
                Some(CanonicalEvent::from_text(decode_text(&line)))
            }
        }
    }
}

/// Every open source, in the order it was opened.
#[derive(Debug, Default)]
pub struct SourceSet {
    handles: Vec<SourceHandle>,
    wait_mask: Option<WaitMask>,
}

// Signal mask installed for the duration of each wait.
struct WaitMask(libc::sigset_t);

impl fmt::Debug for WaitMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WaitMask")
    }
}

impl SourceSet {
    /// Open the sources selected by `spec`.
    pub fn open(spec: &SourceSpec) -> Result<Self> {
        match spec {
            SourceSpec::Explicit(path) => Self::open_explicit(path),
            SourceSpec::Probe(base) => Self::probe(base),
        }
    }

    /// Open exactly one text source. Failure is fatal.
    pub fn open_explicit(path: &Path) -> Result<Self> {
        let handle = SourceHandle::open(path, SourceKind::Text).map_err(|source| {
            Error::SourceOpen {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!("Listening on {}", path.display());
        Ok(Self::from_handles(vec![handle]))
    }

    /// Open `<base>0`, `<base>1`, ... until one fails.
    ///
    /// The first device must exist; a later failure only ends the probe.
    pub fn probe(base: &Path) -> Result<Self> {
        let mut handles = Vec::new();

        for index in 0usize.. {
            let path = numbered_path(base, index);
            match SourceHandle::open(&path, SourceKind::Binary) {
                Ok(handle) => {
                    debug!("Opened {}", path.display());
                    handles.push(handle);
                }
                Err(source) if index == 0 => return Err(Error::SourceOpen { path, source }),
                Err(e) => {
                    debug!("Stopped probing at {}: {}", path.display(), e);
                    break;
                }
            }
        }

        info!("Listening on {} input devices", handles.len());
        Ok(Self::from_handles(handles))
    }

    /// Build a set from already open handles.
    pub fn from_handles(handles: Vec<SourceHandle>) -> Self {
        Self {
            handles,
            wait_mask: None,
        }
    }

    /// Hold `signals` back except while blocked in [`wait_ready`](Self::wait_ready).
    ///
    /// The signals are blocked on the calling thread and unblocked
    /// atomically inside `ppoll(2)`. One that arrives between two waits
    /// stays pending and interrupts the next wait.
    #[allow(unsafe_code)]
    pub fn deliver_signals_while_waiting(&mut self, signals: &[libc::c_int]) -> io::Result<()> {
        // SAFETY: both sets are initialised by sigemptyset/pthread_sigmask before use.
        let mask = unsafe {
            let mut block: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut block);
            for &signo in signals {
                libc::sigaddset(&mut block, signo);
            }
            let mut previous: libc::sigset_t = std::mem::zeroed();
            let rc = libc::pthread_sigmask(libc::SIG_BLOCK, &block, &mut previous);
            if rc != 0 {
                return Err(io::Error::from_raw_os_error(rc));
            }
            for &signo in signals {
                libc::sigdelset(&mut previous, signo);
            }
            previous
        };
        self.wait_mask = Some(WaitMask(mask));
        Ok(())
    }

    /// Sources in opening order.
    pub fn handles(&self) -> &[SourceHandle] {
        &self.handles
    }

    /// Number of open sources.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no source is open.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Block until at least one source is readable.
    ///
    /// Returns the readable indices in opening order. There is no timeout;
    /// only data or a signal ends the wait. Sources that report a hang-up
    /// without data are disabled and skipped from then on.
    #[allow(unsafe_code)]
    pub fn wait_ready(&mut self) -> std::result::Result<Vec<usize>, WaitError> {
        let mut fds: Vec<libc::pollfd> = self
            .handles
            .iter()
            .map(|h| libc::pollfd {
                // poll(2) skips negative descriptors.
                fd: if h.enabled { h.file.as_raw_fd() } else { -1 },
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        let nfds = fds.len() as libc::nfds_t;
        // SAFETY: `fds` is a live, exclusively borrowed buffer of `nfds` pollfd structs.
        let rc = unsafe {
            match &self.wait_mask {
                Some(WaitMask(mask)) => {
                    libc::ppoll(fds.as_mut_ptr(), nfds, std::ptr::null(), mask)
                }
                None => libc::poll(fds.as_mut_ptr(), nfds, -1),
            }
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            return Err(if err.kind() == io::ErrorKind::Interrupted {
                WaitError::Interrupted
            } else {
                WaitError::Failed(err)
            });
        }

        let mut ready = Vec::new();
        for (index, pfd) in fds.iter().enumerate() {
            if pfd.revents & libc::POLLIN != 0 {
                ready.push(index);
            } else if pfd.revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0 {
                self.handles[index].disable("hung up");
            }
        }
        Ok(ready)
    }

    /// Make one decode attempt on the source at `index`.
    ///
    /// Short reads, non-transition values and empty lines yield `None`.
    pub fn read_event(&mut self, index: usize) -> Option<CanonicalEvent> {
        self.handles.get_mut(index)?.read_event()
    }

    /// Close every source, last opened first.
    pub fn close(mut self) {
        self.close_all();
    }

    fn close_all(&mut self) {
        while let Some(handle) = self.handles.pop() {
            debug!("Closing {}", handle.path.display());
            drop(handle);
        }
    }
}

impl EventSource for SourceSet {
    fn wait_ready(&mut self) -> std::result::Result<Vec<usize>, WaitError> {
        SourceSet::wait_ready(self)
    }

    fn read_event(&mut self, index: usize) -> Option<CanonicalEvent> {
        SourceSet::read_event(self, index)
    }
}

impl Drop for SourceSet {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// `<base><index>`, e.g. `/dev/input/event3`.
pub fn numbered_path(base: &Path, index: usize) -> PathBuf {
    let mut path = OsString::from(base.as_os_str());
    path.push(index.to_string());
    PathBuf::from(path)
}

// Read until `buf` is full, EOF, or the source would block.
// `None` means EOF before any byte arrived.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<Option<usize>> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e),
        }
    }
    Ok(Some(filled))
}

// One byte at a time so nothing past the newline is consumed.
// `None` means EOF before any byte arrived.
fn read_line(reader: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) if line.is_empty() => return Ok(None),
            Ok(0) => break,
            Ok(_) => {
                if byte[0] == b'\n' {
                    break;
                }
                line.push(byte[0]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock && !line.is_empty() => break,
            Err(e) => return Err(e),
        }
    }
    Ok(Some(line))
}
