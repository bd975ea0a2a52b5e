//! Command, context and output types passed to lifecycle handlers.

use std::fmt;
use std::io::Write;

use h2ctl_config::ServerConfig;

use super::LifecycleError;
use crate::cli::ServerAction;

/// Supported lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Start,
    Stop,
    Status,
}

impl LifecycleCommand {
    /// Subcommand name as typed on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Settings for the server a command acts on.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleContext<'a> {
    pub config: &'a ServerConfig,
}

/// Writers for command output; diagnostics go through `tracing` instead.
pub struct LifecycleOutput<W: Write, E: Write> {
    pub stdout: W,
    pub stderr: E,
}

impl<W: Write, E: Write> LifecycleOutput<W, E> {
    pub fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    /// Writes one line to standard output and flushes it.
    pub fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        let stdout = &mut self.stdout;
        stdout
            .write_fmt(args)
            .and_then(|()| stdout.write_all(b"\n"))
            .and_then(|()| stdout.flush())
            .map_err(LifecycleError::Io)
    }
}

impl From<ServerAction> for LifecycleCommand {
    fn from(action: ServerAction) -> Self {
        match action {
            ServerAction::Start => Self::Start,
            ServerAction::Stop => Self::Stop,
            ServerAction::Status => Self::Status,
        }
    }
}
