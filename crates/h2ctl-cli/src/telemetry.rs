//! Structured logging for the CLI and relayed server output.
//!
//! Everything is written to standard error. Server output is emitted under
//! the `h2ctl::server` target, so `--log-filter h2ctl::server=off` silences it
//! without hiding lifecycle diagnostics.

use std::io::{self, IsTerminal};

use h2ctl_config::{LogFormat, ServerConfig};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::EnvFilter;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression did not parse.
    #[error("invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },
    /// Another subscriber was already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber on first use.
///
/// Later calls return immediately, even with a different configuration.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when `log_filter` is malformed.
pub fn initialise(config: &ServerConfig) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD.get_or_try_init(|| {
        tracing::subscriber::set_global_default(build_subscriber(config)?)
            .map_err(TelemetryError::Subscriber)
    })?;
    Ok(())
}

fn build_subscriber(
    config: &ServerConfig,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let filter =
        EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
            filter: config.log_filter().to_owned(),
            reason: error.to_string(),
        })?;
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    })
}
