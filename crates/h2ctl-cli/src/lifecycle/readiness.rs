//! Readiness detection over the server's standard output.
//!
//! The server announces each listener with a single line once it is bound.
//! [`await_ready`] consumes output line by line, forwards every line to an
//! [`OutputSink`], and reports [`ReadinessOutcome::Ready`] as soon as both
//! listener announcements have been seen, in either order.

use std::fmt;
use std::io::{self, BufRead};
use std::time::Duration;

use tracing::{debug, info, warn};

/// Tracing target used for relayed server output.
pub const SERVER_OUTPUT_TARGET: &str = "h2ctl::server";

/// A listener announcement the detector waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessMarker {
    /// The data-access (TCP) listener is bound.
    DataListener,
    /// The web console listener is bound.
    ConsoleListener,
}

impl ReadinessMarker {
    /// Every marker required before the server counts as ready.
    pub const ALL: [Self; 2] = [Self::DataListener, Self::ConsoleListener];

    /// Lower-case text identifying the announcement within a line.
    #[must_use]
    pub const fn needle(self) -> &'static str {
        match self {
            Self::DataListener => "tcp server running at",
            Self::ConsoleListener => "web console server running at",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::DataListener => 0b01,
            Self::ConsoleListener => 0b10,
        }
    }

    /// Markers announced by `line`, matched case-insensitively.
    pub fn announced_in(line: &str) -> impl Iterator<Item = Self> {
        let lowered = line.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(move |marker| lowered.contains(marker.needle()))
    }
}

impl fmt::Display for ReadinessMarker {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataListener => formatter.write_str("TCP server"),
            Self::ConsoleListener => formatter.write_str("web console server"),
        }
    }
}

/// Set of markers observed so far.
///
/// Insertion is idempotent, so a repeated announcement never counts twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerSet(u8);

impl MarkerSet {
    /// Records a marker; returns `true` when it was not seen before.
    pub fn insert(&mut self, marker: ReadinessMarker) -> bool {
        let fresh = !self.contains(marker);
        self.0 |= marker.bit();
        fresh
    }

    #[must_use]
    pub const fn contains(self, marker: ReadinessMarker) -> bool {
        self.0 & marker.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every required marker has been seen.
    #[must_use]
    pub fn is_complete(self) -> bool {
        ReadinessMarker::ALL
            .iter()
            .all(|marker| self.contains(*marker))
    }

    /// Markers that have not been seen yet.
    pub fn missing(self) -> impl Iterator<Item = ReadinessMarker> {
        ReadinessMarker::ALL
            .into_iter()
            .filter(move |marker| !self.contains(*marker))
    }

    /// Human-readable list of the missing markers.
    #[must_use]
    pub fn describe_missing(self) -> String {
        let missing: Vec<String> = self.missing().map(|marker| marker.to_string()).collect();
        if missing.is_empty() {
            return String::from("nothing");
        }
        missing.join(" and ")
    }
}

/// Receives every line the server writes to standard output.
pub trait OutputSink {
    fn line(&mut self, line: &str);
}

/// Relays server output through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn line(&mut self, line: &str) {
        info!(target: SERVER_OUTPUT_TARGET, "{line}");
    }
}

/// Why startup did not complete.
#[derive(Debug)]
pub enum LaunchFailure {
    /// The process ended before announcing any listener.
    Exited {
        exit_status: Option<i32>,
        detail: Option<String>,
    },
    /// Watching the process failed.
    Monitor(io::Error),
}

/// Output ended, or the wait expired, with listeners still unannounced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrematureClose {
    /// Markers observed before the stream closed.
    pub seen: MarkerSet,
    /// Exit code, when the process had already exited.
    pub exit_status: Option<i32>,
    /// Last diagnostic line written by the process, if any.
    pub detail: Option<String>,
    /// Set when the wait gave up after this long.
    pub timed_out_after: Option<Duration>,
}

impl PrematureClose {
    pub(crate) const fn closed(seen: MarkerSet) -> Self {
        Self {
            seen,
            exit_status: None,
            detail: None,
            timed_out_after: None,
        }
    }
}

/// Result of waiting for the server to announce both listeners.
#[derive(Debug)]
pub enum ReadinessOutcome {
    Ready,
    LaunchFailed(LaunchFailure),
    StreamClosedPrematurely(PrematureClose),
}

impl ReadinessOutcome {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Reads lines until both markers are seen or the stream ends.
///
/// Every line is handed to `sink` before it is inspected, so nothing written
/// before readiness is lost. Matching is a case-insensitive substring test and
/// bytes that are not valid UTF-8 are replaced rather than rejected. A read
/// error is logged and handled as the end of the stream. Lines after the
/// readiness point are left unread in `reader`.
pub fn await_ready<R, S>(reader: &mut R, sink: &mut S) -> ReadinessOutcome
where
    R: BufRead + ?Sized,
    S: OutputSink + ?Sized,
{
    let mut seen = MarkerSet::default();
    let mut buffer = Vec::new();
    loop {
        match read_line(reader, &mut buffer) {
            Ok(Some(line)) => {
                sink.line(&line);
                for marker in ReadinessMarker::announced_in(&line) {
                    if seen.insert(marker) {
                        debug!(%marker, "server announced listener");
                    }
                }
                if seen.is_complete() {
                    return ReadinessOutcome::Ready;
                }
            }
            Ok(None) => {
                return ReadinessOutcome::StreamClosedPrematurely(PrematureClose::closed(seen));
            }
            Err(error) => {
                warn!(%error, "failed to read server output; treating stream as closed");
                return ReadinessOutcome::StreamClosedPrematurely(PrematureClose::closed(seen));
            }
        }
    }
}

/// Forwards the remaining lines to `sink` until the stream ends.
pub fn drain<R, S>(reader: &mut R, sink: &mut S)
where
    R: BufRead + ?Sized,
    S: OutputSink + ?Sized,
{
    let mut buffer = Vec::new();
    loop {
        match read_line(reader, &mut buffer) {
            Ok(Some(line)) => sink.line(&line),
            Ok(None) => return,
            Err(error) => {
                debug!(%error, "stopped relaying server output");
                return;
            }
        }
    }
}

fn read_line<R: BufRead + ?Sized>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
) -> io::Result<Option<String>> {
    buffer.clear();
    if reader.read_until(b'\n', buffer)? == 0 {
        return Ok(None);
    }
    while matches!(buffer.last(), Some(b'\n' | b'\r')) {
        buffer.pop();
    }
    Ok(Some(String::from_utf8_lossy(buffer).into_owned()))
}
