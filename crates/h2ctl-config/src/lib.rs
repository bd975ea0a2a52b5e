//! Shared configuration for the `h2ctl` lifecycle tool.
//!
//! [`ServerConfig`] is loaded once per invocation by layering built-in
//! defaults, an optional TOML file, `H2CTL_*` environment variables and
//! command-line flags (later layers win). The resulting value is treated as
//! read-only: the argument builders in [`arguments`] and the runtime resolver
//! in [`runtime`] only ever borrow it.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub mod arguments;
mod defaults;
mod error;
mod logging;
pub mod runtime;
mod toggle;

pub use arguments::{shutdown_args, shutdown_url, start_args, stop_args};
pub use defaults::{
    DEFAULT_CONSOLE_PORT, DEFAULT_DATA_PORT, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAIN_CLASS,
    DEFAULT_PASSWORD, DEFAULT_RUNTIME_ARTIFACT, DEFAULT_SHUTDOWN_TIMEOUT_MS, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use error::ConfigError;
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{ArtifactCoordinate, RuntimeError, ServerRuntime};
pub use toggle::{Toggle, ToggleParseError};

use defaults::{
    default_console_port, default_data_port, default_host, default_main_class, default_password,
    default_off, default_on, default_runtime_artifact, default_shutdown_timeout_ms,
};

/// Declarative settings for one start or stop invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "H2CTL")]
pub struct ServerConfig {
    /// Port of the data-access (TCP) listener.
    #[serde(default = "default_data_port")]
    pub data_port: u16,
    /// Password guarding the data-access listener and its shutdown command.
    #[serde(default = "default_password")]
    pub data_password: String,
    /// Port of the administrative web console.
    #[serde(default = "default_console_port")]
    pub console_port: u16,
    /// Admin password for the web console.
    #[serde(default = "default_password")]
    pub console_password: String,
    /// Create databases on first connection (`-ifNotExists`).
    #[serde(default = "default_on")]
    pub create_if_missing: Toggle,
    /// Accept data connections from other hosts.
    #[serde(default = "default_on")]
    pub allow_remote_data_connections: Toggle,
    /// Accept console connections from other hosts.
    #[serde(default = "default_on")]
    pub allow_remote_console_connections: Toggle,
    /// Ask the server to open the console in a browser once started.
    #[serde(default = "default_off")]
    pub open_console_in_browser: Toggle,
    /// Maven coordinate (`group:artifact:version`) of the server build.
    #[serde(default = "default_runtime_artifact")]
    pub runtime_artifact: String,
    /// Host targeted by the shutdown request.
    #[serde(default = "default_host")]
    pub host: String,
    /// Java executable used to run the server.
    #[serde(default)]
    pub java_binary: Option<String>,
    /// Explicit classpath; derived from `runtime_artifact` when absent.
    #[serde(default)]
    pub classpath: Option<String>,
    /// Main class of the server tool.
    #[serde(default = "default_main_class")]
    pub main_class: String,
    /// Base directory for database files (`-baseDir`).
    #[serde(default)]
    pub base_dir: Option<String>,
    /// Bound on the readiness wait; unbounded when absent.
    #[serde(default)]
    pub startup_timeout_ms: Option<u64>,
    /// Bound on the shutdown client's run time.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Tracing filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Tracing output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_port: DEFAULT_DATA_PORT,
            data_password: default_password(),
            console_port: DEFAULT_CONSOLE_PORT,
            console_password: default_password(),
            create_if_missing: Toggle::ON,
            allow_remote_data_connections: Toggle::ON,
            allow_remote_console_connections: Toggle::ON,
            open_console_in_browser: Toggle::OFF,
            runtime_artifact: default_runtime_artifact(),
            host: default_host(),
            java_binary: None,
            classpath: None,
            main_class: default_main_class(),
            base_dir: None,
            startup_timeout_ms: None,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl ServerConfig {
    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Tracing output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Bound on the readiness wait, if one is configured.
    #[must_use]
    pub fn startup_timeout(&self) -> Option<Duration> {
        self.startup_timeout_ms.map(Duration::from_millis)
    }

    /// Bound on the shutdown client's run time.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Rejects settings the server would refuse or misinterpret.
    ///
    /// Layered loading only checks types, so caller-supplied values such as a
    /// zero port or an empty password are caught here before anything is
    /// spawned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_port("data_port", self.data_port)?;
        ensure_port("console_port", self.console_port)?;
        if self.data_port == self.console_port {
            return Err(ConfigError::PortCollision {
                port: self.data_port,
            });
        }
        ensure_password("data_password", &self.data_password)?;
        ensure_password("console_password", &self.console_password)?;
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.main_class.trim().is_empty() {
            return Err(ConfigError::EmptyMainClass);
        }
        self.runtime_artifact
            .parse::<ArtifactCoordinate>()
            .map_err(|source| ConfigError::Runtime { source })?;
        if self.startup_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout {
                field: "startup_timeout_ms",
            });
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "shutdown_timeout_ms",
            });
        }
        Ok(())
    }
}

fn ensure_port(field: &'static str, port: u16) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::InvalidPort { field });
    }
    Ok(())
}

fn ensure_password(field: &'static str, password: &str) -> Result<(), ConfigError> {
    if password.is_empty() {
        return Err(ConfigError::EmptyPassword { field });
    }
    Ok(())
}
