//! Event loop and command-line tests.

use acpid_config::{ActionTable, DaemonConfig, EventMapEntry, MappingTables, SourceSpec, Table};
use acpid_daemon::{run_event_loop, Cli, Commands, LoopExit};
use acpid_watch::{
    ActionHandler, CanonicalEvent, EventSource, RawInputEvent, SourceHandle, SourceKind, SourceSet,
    WaitError,
};
use clap::Parser;
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

#[derive(Default)]
struct RecordingHandler {
    actions: RefCell<Vec<String>>,
}

impl ActionHandler for RecordingHandler {
    fn handle(&self, action_path: &str) {
        self.actions.borrow_mut().push(action_path.to_string());
    }
}

/// Interrupted `interruptions` times, then fails for good.
struct FailingWait {
    interruptions: usize,
    waits: usize,
}

impl FailingWait {
    fn new(interruptions: usize) -> Self {
        Self {
            interruptions,
            waits: 0,
        }
    }
}

impl EventSource for FailingWait {
    fn wait_ready(&mut self) -> Result<Vec<usize>, WaitError> {
        self.waits += 1;
        if self.waits <= self.interruptions {
            Err(WaitError::Interrupted)
        } else {
            Err(WaitError::Failed(io::Error::from_raw_os_error(libc::EINVAL)))
        }
    }

    fn read_event(&mut self, _index: usize) -> Option<CanonicalEvent> {
        None
    }
}

fn socket_source(kind: SourceKind, name: &str) -> (SourceHandle, UnixStream) {
    let (reader, writer) = UnixStream::pair().unwrap();
    reader.set_nonblocking(true).unwrap();
    let file = File::from(OwnedFd::from(reader));
    (SourceHandle::from_file(file, kind, name), writer)
}

#[test]
fn test_loop_dispatches_until_signalled() {
    let (text, mut text_tx) = socket_source(SourceKind::Text, "proc");
    let (input, mut input_tx) = socket_source(SourceKind::Binary, "event0");
    let mut sources = SourceSet::from_handles(vec![text, input]);
    let tables = MappingTables::new(
        Table::from_rows(vec![
            EventMapEntry::new("EV_KEY", 0x01, "KEY_POWER", 116, 1, "button/power PWRF 00000080"),
            EventMapEntry::new("EV_SW", 0x05, "SW_LID", 0, 1, "button/lid LID0 00000080"),
        ]),
        ActionTable::defaults(),
    );
    let handler = RecordingHandler::default();

    text_tx
        .write_all(b"button/lid LID0 00000080 00000001\n")
        .unwrap();
    input_tx
        .write_all(&RawInputEvent::new(1, 116, 1).to_bytes())
        .unwrap();

    let exit = run_event_loop(&mut sources, &tables, &handler, true, || {
        (handler.actions.borrow().len() >= 2).then_some(libc::SIGTERM)
    });

    assert!(matches!(exit, LoopExit::Signal(libc::SIGTERM)));
    assert_eq!(
        *handler.actions.borrow(),
        vec!["LID/00000080", "PWRF/00000080"]
    );
}

#[test]
fn test_pending_signal_stops_before_waiting() {
    let (handle, _tx) = socket_source(SourceKind::Binary, "idle");
    let mut sources = SourceSet::from_handles(vec![handle]);
    let handler = RecordingHandler::default();

    // Nothing is readable; a wait would block forever.
    let exit = run_event_loop(
        &mut sources,
        &MappingTables::default(),
        &handler,
        false,
        || Some(libc::SIGHUP),
    );

    assert!(matches!(exit, LoopExit::Signal(libc::SIGHUP)));
    assert!(handler.actions.borrow().is_empty());
}

#[test]
fn test_unmatched_and_repeat_events_are_skipped() {
    let (handle, mut tx) = socket_source(SourceKind::Binary, "kbd");
    let mut sources = SourceSet::from_handles(vec![handle]);
    let handler = RecordingHandler::default();
    let attempts = RefCell::new(0);

    // Autorepeat of the power key, an unmapped key, then a real press.
    tx.write_all(&RawInputEvent::new(1, 116, 2).to_bytes()).unwrap();
    tx.write_all(&RawInputEvent::new(1, 30, 1).to_bytes()).unwrap();
    tx.write_all(&RawInputEvent::new(1, 116, 1).to_bytes()).unwrap();

    let exit = run_event_loop(
        &mut sources,
        &MappingTables::default(),
        &handler,
        false,
        || {
            *attempts.borrow_mut() += 1;
            (*attempts.borrow() > 3).then_some(libc::SIGINT)
        },
    );

    assert!(matches!(exit, LoopExit::Signal(libc::SIGINT)));
    assert_eq!(*handler.actions.borrow(), vec!["PWRF/00000080"]);
}

#[test]
fn test_wait_failure_ends_loop() {
    let mut sources = FailingWait::new(0);
    let handler = RecordingHandler::default();

    let exit = run_event_loop(&mut sources, &MappingTables::default(), &handler, false, || None);

    match exit {
        LoopExit::WaitFailed(e) => assert_eq!(e.raw_os_error(), Some(libc::EINVAL)),
        other => panic!("unexpected exit: {other:?}"),
    }
    assert_eq!(sources.waits, 1);
}

#[test]
fn test_interrupted_wait_without_signal_is_retried() {
    let mut sources = FailingWait::new(2);
    let handler = RecordingHandler::default();

    let exit = run_event_loop(&mut sources, &MappingTables::default(), &handler, false, || None);

    assert!(matches!(exit, LoopExit::WaitFailed(_)));
    assert_eq!(sources.waits, 3);
}

#[test]
fn test_interrupted_wait_with_signal_ends_loop() {
    let mut sources = FailingWait::new(usize::MAX);
    let handler = RecordingHandler::default();
    let checks = RefCell::new(0);

    // The first check precedes any wait; the second follows the interruption.
    let exit = run_event_loop(&mut sources, &MappingTables::default(), &handler, false, || {
        *checks.borrow_mut() += 1;
        (*checks.borrow() == 2).then_some(libc::SIGTERM)
    });

    assert!(matches!(exit, LoopExit::Signal(libc::SIGTERM)));
    assert_eq!(sources.waits, 1);
}

#[test]
fn test_blank_text_line_dispatches_first_row() {
    let (handle, mut tx) = socket_source(SourceKind::Text, "proc");
    let mut sources = SourceSet::from_handles(vec![handle]);
    let handler = RecordingHandler::default();

    tx.write_all(b"\n").unwrap();
    let exit = run_event_loop(&mut sources, &MappingTables::default(), &handler, false, || {
        (!handler.actions.borrow().is_empty()).then_some(libc::SIGTERM)
    });

    assert!(matches!(exit, LoopExit::Signal(libc::SIGTERM)));
    assert_eq!(*handler.actions.borrow(), vec!["PWRF/00000080"]);
}

#[test]
fn test_short_flags_fill_settings() {
    let cli = Cli::try_parse_from([
        "acpid", "-f", "-c", "/tmp/acpi", "-e", "/tmp/event", "-l", "/tmp/acpid.log", "-a",
        "/tmp/acpid.conf", "-M", "/tmp/acpi.map", "-p", "/tmp/acpid.pid",
    ])
    .unwrap();
    let config = cli.apply_to(DaemonConfig::default());

    assert!(cli.stays_in_foreground());
    assert_eq!(config.conf_dir, PathBuf::from("/tmp/acpi"));
    assert_eq!(config.log_file, PathBuf::from("/tmp/acpid.log"));
    assert_eq!(config.action_file, PathBuf::from("/tmp/acpid.conf"));
    assert_eq!(config.map_file, PathBuf::from("/tmp/acpi.map"));
    assert_eq!(config.pid_file, PathBuf::from("/tmp/acpid.pid"));
    assert_eq!(
        config.source_spec(),
        SourceSpec::Explicit(PathBuf::from("/tmp/event"))
    );
}

#[test]
fn test_compatibility_options_are_ignored() {
    let cli = Cli::try_parse_from([
        "acpid", "-d", "-g", "wheel", "-m", "0666", "-s", "/run/acpid.socket", "-S", "x", "-v",
    ])
    .unwrap();

    assert!(cli.debug);
    assert_eq!(cli.apply_to(DaemonConfig::default()), DaemonConfig::default());
}

#[test]
fn test_run_parts_subcommand() {
    let cli = Cli::try_parse_from(["acpid", "run-parts", "/etc/acpi/PWRF/00000080"]).unwrap();
    match cli.command {
        Some(Commands::RunParts { dir }) => {
            assert_eq!(dir, PathBuf::from("/etc/acpi/PWRF/00000080"))
        }
        other => panic!("unexpected command: {other:?}"),
    }
}
