//! Startup supervision for a launched server.
//!
//! Three threads cooperate while the server starts and all report to a single
//! channel:
//! - the output watcher runs [`await_ready`] over standard output, reports
//!   each listener as it is announced, and keeps relaying lines after
//!   readiness;
//! - the diagnostics relay forwards standard error and remembers the first
//!   line for error reports;
//! - the supervisor owns the [`Child`], polls it for exit, and obeys a single
//!   release or kill command.
//!
//! [`wait_for_ready`] consumes those events and settles on one
//! [`ReadinessOutcome`]. When the process exits and readiness is announced at
//! about the same time, readiness wins: an exit only shortens the wait to a
//! short grace period during which buffered output may still arrive.

use std::io::{self, BufReader};
use std::process::{Child, ExitStatus};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::error::LifecycleError;
use super::launcher::LaunchedServer;
use super::readiness::{
    LaunchFailure, MarkerSet, OutputSink, PrematureClose, ReadinessMarker, ReadinessOutcome,
    SERVER_OUTPUT_TARGET, await_ready, drain,
};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Messages delivered to the startup coordinator.
#[derive(Debug)]
pub(super) enum StartupEvent {
    Progress(ReadinessMarker),
    Readiness(ReadinessOutcome),
    Diagnostic(String),
    Exited(ExitStatus),
    MonitorFailed(io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SupervisorCommand {
    Release,
    Kill,
}

/// Handle over the threads watching one launched server.
pub(super) struct StartupMonitor {
    pid: u32,
    events: Receiver<StartupEvent>,
    control: Sender<SupervisorCommand>,
}

impl StartupMonitor {
    /// Starts the watcher, diagnostics and supervisor threads.
    ///
    /// The child is killed if any thread fails to start.
    pub(super) fn spawn<S>(server: LaunchedServer, sink: S) -> Result<Self, LifecycleError>
    where
        S: OutputSink + Send + 'static,
    {
        let LaunchedServer {
            mut child,
            stdout,
            stderr,
        } = server;
        let pid = child.id();
        let (events_tx, events) = mpsc::channel();
        let (control, control_rx) = mpsc::channel();

        let watcher_events = events_tx.clone();
        if let Err(source) = thread::Builder::new()
            .name(String::from("h2ctl-stdout"))
            .spawn(move || watch_output(stdout, sink, &watcher_events))
        {
            terminate(&mut child);
            return Err(LifecycleError::SpawnThread {
                name: "output watcher",
                source,
            });
        }

        if let Some(stderr) = stderr {
            let mut diagnostics = DiagnosticSink {
                events: events_tx.clone(),
            };
            if let Err(source) = thread::Builder::new()
                .name(String::from("h2ctl-stderr"))
                .spawn(move || drain(&mut BufReader::new(stderr), &mut diagnostics))
            {
                terminate(&mut child);
                return Err(LifecycleError::SpawnThread {
                    name: "diagnostics relay",
                    source,
                });
            }
        }

        thread::Builder::new()
            .name(String::from("h2ctl-supervisor"))
            .spawn(move || supervise(child, &events_tx, &control_rx))
            .map_err(|source| LifecycleError::SpawnThread {
                name: "supervisor",
                source,
            })?;

        Ok(Self {
            pid,
            events,
            control,
        })
    }

    pub(super) const fn pid(&self) -> u32 {
        self.pid
    }

    /// Waits for the startup verdict and tells the supervisor what to do.
    ///
    /// A ready server is released and keeps running; any other outcome kills
    /// the process before returning.
    pub(super) fn settle(self, timeout: Option<Duration>) -> ReadinessOutcome {
        let outcome = wait_for_ready(&self.events, timeout);
        let command = if outcome.is_ready() {
            SupervisorCommand::Release
        } else {
            SupervisorCommand::Kill
        };
        debug!(pid = self.pid, ?command, "startup settled");
        // The supervisor may already have returned after observing an exit.
        let _ = self.control.send(command);
        outcome
    }
}

fn watch_output<S: OutputSink>(
    stdout: std::process::ChildStdout,
    sink: S,
    events: &Sender<StartupEvent>,
) {
    let mut sink = ProgressSink::new(sink, events.clone());
    let mut reader = BufReader::new(stdout);
    let outcome = await_ready(&mut reader, &mut sink);
    let ready = outcome.is_ready();
    let _ = events.send(StartupEvent::Readiness(outcome));
    if ready {
        drain(&mut reader, &mut sink);
    }
}

/// Reports each newly announced listener before passing the line on.
struct ProgressSink<S> {
    inner: S,
    seen: MarkerSet,
    events: Sender<StartupEvent>,
}

impl<S> ProgressSink<S> {
    fn new(inner: S, events: Sender<StartupEvent>) -> Self {
        Self {
            inner,
            seen: MarkerSet::default(),
            events,
        }
    }
}

impl<S: OutputSink> OutputSink for ProgressSink<S> {
    fn line(&mut self, line: &str) {
        self.inner.line(line);
        for marker in ReadinessMarker::announced_in(line) {
            if self.seen.insert(marker) {
                let _ = self.events.send(StartupEvent::Progress(marker));
            }
        }
    }
}

/// Relays standard error and reports each line to the coordinator.
struct DiagnosticSink {
    events: Sender<StartupEvent>,
}

impl OutputSink for DiagnosticSink {
    fn line(&mut self, line: &str) {
        warn!(target: SERVER_OUTPUT_TARGET, "{line}");
        if !line.trim().is_empty() {
            // Nobody listens once startup has settled.
            let _ = self.events.send(StartupEvent::Diagnostic(line.to_owned()));
        }
    }
}

fn supervise(
    mut child: Child,
    events: &Sender<StartupEvent>,
    control: &Receiver<SupervisorCommand>,
) {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(%status, "server process exited");
                let _ = events.send(StartupEvent::Exited(status));
                return;
            }
            Ok(None) => {}
            Err(source) => {
                terminate(&mut child);
                let _ = events.send(StartupEvent::MonitorFailed(source));
                return;
            }
        }
        match control.recv_timeout(POLL_INTERVAL) {
            Ok(SupervisorCommand::Kill) => {
                terminate(&mut child);
                return;
            }
            Ok(SupervisorCommand::Release) | Err(RecvTimeoutError::Disconnected) => {
                reap(child);
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

fn terminate(child: &mut Child) {
    let pid = child.id();
    if let Err(error) = child.kill() {
        debug!(pid, %error, "server process could not be killed");
    }
    match child.wait() {
        Ok(status) => debug!(pid, %status, "server process terminated"),
        Err(error) => warn!(pid, %error, "failed to reap terminated server process"),
    }
}

/// Blocks until a released server exits so it does not linger as a zombie.
fn reap(mut child: Child) {
    let pid = child.id();
    match child.wait() {
        Ok(status) => debug!(pid, %status, "released server process exited"),
        Err(error) => debug!(pid, %error, "stopped watching released server process"),
    }
}

/// Consumes startup events until a single outcome is known.
pub(super) fn wait_for_ready(
    events: &Receiver<StartupEvent>,
    timeout: Option<Duration>,
) -> ReadinessOutcome {
    let mut deadline = timeout.map(|limit| Instant::now() + limit);
    let mut seen = MarkerSet::default();
    let mut exited: Option<ExitStatus> = None;
    let mut diagnostic: Option<String> = None;
    loop {
        let event = match next_event(events, deadline) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return expired(seen, exited, diagnostic, timeout),
            Err(RecvTimeoutError::Disconnected) => return classify(seen, exited, diagnostic),
        };
        match event {
            StartupEvent::Progress(marker) => {
                seen.insert(marker);
            }
            StartupEvent::Readiness(ReadinessOutcome::StreamClosedPrematurely(close)) => {
                let status = exited.or_else(|| await_exit(events, &mut diagnostic));
                collect_pending(events, &mut diagnostic);
                return classify(close.seen, status, diagnostic);
            }
            StartupEvent::Readiness(outcome) => return outcome,
            StartupEvent::Diagnostic(line) => {
                diagnostic.get_or_insert(line);
            }
            StartupEvent::Exited(status) => {
                debug!(%status, "server exited while starting; waiting for buffered output");
                exited = Some(status);
                let grace = Instant::now() + EXIT_GRACE;
                deadline = Some(deadline.map_or(grace, |current| current.min(grace)));
            }
            StartupEvent::MonitorFailed(source) => {
                return ReadinessOutcome::LaunchFailed(LaunchFailure::Monitor(source));
            }
        }
    }
}

fn next_event(
    events: &Receiver<StartupEvent>,
    deadline: Option<Instant>,
) -> Result<StartupEvent, RecvTimeoutError> {
    match deadline {
        Some(deadline) => events.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => events.recv().map_err(|_| RecvTimeoutError::Disconnected),
    }
}

/// Output has closed; give the supervisor a moment to report the exit.
fn await_exit(events: &Receiver<StartupEvent>, diagnostic: &mut Option<String>) -> Option<ExitStatus> {
    let deadline = Instant::now() + EXIT_GRACE;
    loop {
        match next_event(events, Some(deadline)) {
            Ok(StartupEvent::Exited(status)) => return Some(status),
            Ok(StartupEvent::Diagnostic(line)) => {
                diagnostic.get_or_insert(line);
            }
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}

fn collect_pending(events: &Receiver<StartupEvent>, diagnostic: &mut Option<String>) {
    for event in events.try_iter() {
        if let StartupEvent::Diagnostic(line) = event {
            diagnostic.get_or_insert(line);
        }
    }
}

/// Zero markers plus an exit is a failed launch; anything else is a
/// premature close.
fn classify(
    seen: MarkerSet,
    exited: Option<ExitStatus>,
    detail: Option<String>,
) -> ReadinessOutcome {
    let exit_status = exited.and_then(|status| status.code());
    if seen.is_empty() && exited.is_some() {
        return ReadinessOutcome::LaunchFailed(LaunchFailure::Exited {
            exit_status,
            detail,
        });
    }
    ReadinessOutcome::StreamClosedPrematurely(PrematureClose {
        seen,
        exit_status,
        detail,
        timed_out_after: None,
    })
}

fn expired(
    seen: MarkerSet,
    exited: Option<ExitStatus>,
    detail: Option<String>,
    timeout: Option<Duration>,
) -> ReadinessOutcome {
    if exited.is_some() {
        return classify(seen, exited, detail);
    }
    ReadinessOutcome::StreamClosedPrematurely(PrematureClose {
        detail,
        timed_out_after: timeout,
        ..PrematureClose::closed(seen)
    })
}
