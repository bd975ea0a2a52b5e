//! Error types for server lifecycle operations.

use std::ffi::OsString;
use std::fmt;
use std::io;

use h2ctl_config::{ConfigError, RuntimeError};
use thiserror::Error;

use super::readiness::{LaunchFailure, PrematureClose, ReadinessOutcome};

/// Which of the two listeners an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    Data,
    Console,
}

impl Listener {
    /// Configuration field holding this listener's port.
    #[must_use]
    pub const fn port_setting(self) -> &'static str {
        match self {
            Self::Data => "--data-port",
            Self::Console => "--console-port",
        }
    }
}

impl fmt::Display for Listener {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => formatter.write_str("data"),
            Self::Console => formatter.write_str("console"),
        }
    }
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Settings were rejected before anything was spawned.
    Configuration,
    /// The server process could not be started or died before announcing
    /// any listener.
    LaunchFailed,
    /// Output ended, or the wait expired, before both listeners were up.
    StreamClosedPrematurely,
    /// A shutdown request could not be delivered or was refused.
    ShutdownFailed,
    /// Writing lifecycle output to the caller failed.
    Output,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::LaunchFailed => "launch failed",
            Self::StreamClosedPrematurely => "stream closed prematurely",
            Self::ShutdownFailed => "shutdown failed",
            Self::Output => "output",
        };
        formatter.write_str(label)
    }
}

/// Errors raised while executing lifecycle commands.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid configuration: {source}")]
    Configuration {
        #[from]
        source: ConfigError,
    },
    #[error("failed to resolve server runtime: {source}")]
    Runtime {
        #[from]
        source: RuntimeError,
    },
    #[error(
        "{listener} port {endpoint} is already in use; stop the existing server or change {}",
        .listener.port_setting()
    )]
    PortInUse { listener: Listener, endpoint: String },
    #[error("failed to probe {endpoint}: {source}")]
    SocketProbe {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to launch server with '{program:?}': {source}")]
    Launch {
        program: OsString,
        #[source]
        source: io::Error,
    },
    #[error("failed to start {name} thread: {source}")]
    SpawnThread {
        name: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("server exited before reporting ready (status: {exit_status:?}){}", render_detail(.detail.as_deref()))]
    ExitedBeforeReady {
        exit_status: Option<i32>,
        detail: Option<String>,
    },
    #[error("failed to monitor server process: {source}")]
    MonitorChild {
        #[source]
        source: io::Error,
    },
    #[error(
        "server output closed before the {missing} reported ready (status: {exit_status:?}){}",
        render_detail(.detail.as_deref())
    )]
    StreamClosedPrematurely {
        missing: String,
        exit_status: Option<i32>,
        detail: Option<String>,
    },
    #[error("server did not report ready within {timeout_ms} ms; still waiting on the {missing}")]
    StartupTimeout { timeout_ms: u64, missing: String },
    #[error("failed to probe {endpoint} before shutdown: {source}")]
    ShutdownProbe {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("no server is listening at {endpoint}")]
    NotListening { endpoint: String },
    #[error("server at {endpoint} rejected the shutdown request: {detail}")]
    ShutdownRejected { endpoint: String, detail: String },
    #[error("failed to run shutdown client '{program:?}': {source}")]
    ShutdownClient {
        program: OsString,
        #[source]
        source: io::Error,
    },
    #[error("shutdown request to {endpoint} did not complete within {timeout_ms} ms")]
    ShutdownTimeout { endpoint: String, timeout_ms: u64 },
    #[error("failed to write lifecycle output: {0}")]
    Io(#[source] io::Error),
}

impl LifecycleError {
    /// Coarse classification of this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration { .. } | Self::Runtime { .. } => FailureKind::Configuration,
            Self::PortInUse { .. }
            | Self::SocketProbe { .. }
            | Self::Launch { .. }
            | Self::SpawnThread { .. }
            | Self::ExitedBeforeReady { .. }
            | Self::MonitorChild { .. } => FailureKind::LaunchFailed,
            Self::StreamClosedPrematurely { .. } | Self::StartupTimeout { .. } => {
                FailureKind::StreamClosedPrematurely
            }
            Self::ShutdownProbe { .. }
            | Self::NotListening { .. }
            | Self::ShutdownRejected { .. }
            | Self::ShutdownClient { .. }
            | Self::ShutdownTimeout { .. } => FailureKind::ShutdownFailed,
            Self::Io(_) => FailureKind::Output,
        }
    }

    /// Converts a non-ready outcome into the matching error.
    ///
    /// Returns `None` for [`ReadinessOutcome::Ready`].
    #[must_use]
    pub fn from_outcome(outcome: ReadinessOutcome) -> Option<Self> {
        match outcome {
            ReadinessOutcome::Ready => None,
            ReadinessOutcome::LaunchFailed(LaunchFailure::Exited {
                exit_status,
                detail,
            }) => Some(Self::ExitedBeforeReady {
                exit_status,
                detail,
            }),
            ReadinessOutcome::LaunchFailed(LaunchFailure::Monitor(source)) => {
                Some(Self::MonitorChild { source })
            }
            ReadinessOutcome::StreamClosedPrematurely(close) => Some(Self::from_close(close)),
        }
    }

    fn from_close(close: PrematureClose) -> Self {
        match close.timed_out_after {
            Some(timeout) => Self::StartupTimeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                missing: close.seen.describe_missing(),
            },
            None => Self::StreamClosedPrematurely {
                missing: close.seen.describe_missing(),
                exit_status: close.exit_status,
                detail: close.detail,
            },
        }
    }
}

fn render_detail(detail: Option<&str>) -> String {
    detail.map(|line| format!(": {line}")).unwrap_or_default()
}
