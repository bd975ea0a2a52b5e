use thiserror::Error;

use crate::runtime::RuntimeError;

/// Settings rejected by [`crate::ServerConfig::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A listener port was zero.
    #[error("{field} must be a port between 1 and 65535")]
    InvalidPort { field: &'static str },
    /// Both listeners were configured on the same port.
    #[error("data_port and console_port must differ (both set to {port})")]
    PortCollision { port: u16 },
    /// A listener password was empty.
    #[error("{field} must not be empty")]
    EmptyPassword { field: &'static str },
    /// The shutdown host was blank.
    #[error("host must not be empty")]
    EmptyHost,
    /// The server main class was blank.
    #[error("main_class must not be empty")]
    EmptyMainClass,
    /// A timeout was configured as zero milliseconds.
    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
    /// The runtime artifact could not be interpreted.
    #[error(transparent)]
    Runtime {
        #[from]
        source: RuntimeError,
    },
}
