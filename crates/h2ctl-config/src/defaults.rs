//! Built-in defaults applied when no configuration layer supplies a value.

use crate::Toggle;

/// Default port for the data-access (TCP) listener.
pub const DEFAULT_DATA_PORT: u16 = 9092;

/// Default port for the administrative web console listener.
pub const DEFAULT_CONSOLE_PORT: u16 = 8082;

/// Default password guarding both listeners.
pub const DEFAULT_PASSWORD: &str = "admin";

/// Default host targeted by shutdown requests.
pub const DEFAULT_HOST: &str = "localhost";

/// Maven coordinate of the server build launched when none is configured.
pub const DEFAULT_RUNTIME_ARTIFACT: &str = "com.h2database:h2:2.0.202";

/// Entry point class of the H2 server tool.
pub const DEFAULT_MAIN_CLASS: &str = "org.h2.tools.Server";

/// Upper bound on how long the shutdown client may run.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 30_000;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

pub(crate) const fn default_data_port() -> u16 {
    DEFAULT_DATA_PORT
}

pub(crate) const fn default_console_port() -> u16 {
    DEFAULT_CONSOLE_PORT
}

pub(crate) fn default_password() -> String {
    DEFAULT_PASSWORD.to_owned()
}

pub(crate) fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

pub(crate) const fn default_on() -> Toggle {
    Toggle::ON
}

pub(crate) const fn default_off() -> Toggle {
    Toggle::OFF
}

pub(crate) fn default_runtime_artifact() -> String {
    DEFAULT_RUNTIME_ARTIFACT.to_owned()
}

pub(crate) fn default_main_class() -> String {
    DEFAULT_MAIN_CLASS.to_owned()
}

pub(crate) const fn default_shutdown_timeout_ms() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binary.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}
