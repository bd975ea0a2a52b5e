//! Error types for the CLI runtime.

use std::sync::Arc;

use thiserror::Error;

use crate::lifecycle::LifecycleError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("server {command} failed ({kind}): {source}", kind = .source.kind())]
    Lifecycle {
        command: crate::lifecycle::LifecycleCommand,
        #[source]
        source: LifecycleError,
    },
}
