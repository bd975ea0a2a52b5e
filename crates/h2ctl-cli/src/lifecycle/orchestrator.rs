//! Start, stop and status flows over a [`ServerConfig`].
//!
//! These functions hold no state between calls: every operation works from
//! the configuration it is given, so a stop issued by a different process
//! than the one that started the server behaves the same way.

use h2ctl_config::{ServerConfig, ServerRuntime, shutdown_url, start_args};
use tracing::{debug, info};

use super::error::{LifecycleError, Listener};
use super::launcher::launch;
use super::readiness::{OutputSink, TracingSink};
use super::shutdown::{ShutdownRequest, request_shutdown};
use super::socket::{LOCAL_HOST, ensure_port_available, port_is_reachable};
use super::startup::StartupMonitor;

/// A server that has announced both listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedServer {
    pub pid: u32,
    pub data_url: String,
    pub console_url: String,
}

/// Reachability of both listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub data_url: String,
    pub data_listening: bool,
    pub console_url: String,
    pub console_listening: bool,
}

impl ServerStatus {
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.data_listening && self.console_listening
    }

    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        !self.data_listening && !self.console_listening
    }
}

/// Launches the server and returns once both listeners are up.
///
/// Server output is relayed through `tracing`. See [`start_server_with_sink`].
///
/// # Errors
///
/// See [`start_server_with_sink`].
pub fn start_server(config: &ServerConfig) -> Result<StartedServer, LifecycleError> {
    start_server_with_sink(config, TracingSink)
}

/// Launches the server, relaying its output to `sink`.
///
/// The configuration is validated and both ports are probed before anything
/// is spawned. The call blocks until both listeners are announced, the output
/// ends, or the configured startup timeout expires. On success the process
/// keeps running after this call returns; on failure it has been killed.
///
/// # Errors
///
/// Returns an error whose [`LifecycleError::kind`] is:
/// - `Configuration` when validation or runtime resolution fails;
/// - `LaunchFailed` when a port is taken, the process cannot be spawned, or
///   it exits before announcing any listener;
/// - `StreamClosedPrematurely` when output ends, or the wait expires, with a
///   listener still unannounced.
pub fn start_server_with_sink<S>(
    config: &ServerConfig,
    sink: S,
) -> Result<StartedServer, LifecycleError>
where
    S: OutputSink + Send + 'static,
{
    config.validate()?;
    ensure_port_available(Listener::Data, LOCAL_HOST, config.data_port)?;
    ensure_port_available(Listener::Console, LOCAL_HOST, config.console_port)?;
    let runtime = ServerRuntime::from_config(config)?;

    debug!(state = "launching", "server lifecycle transition");
    let server = launch(&runtime, &start_args(config))?;
    let monitor = StartupMonitor::spawn(server, sink)?;
    let pid = monitor.pid();

    debug!(state = "awaiting_readiness", pid, "server lifecycle transition");
    let outcome = monitor.settle(config.startup_timeout());
    if let Some(error) = LifecycleError::from_outcome(outcome) {
        debug!(state = "failed", pid, kind = %error.kind(), "server lifecycle transition");
        return Err(error);
    }

    let started = StartedServer {
        pid,
        data_url: shutdown_url(&config.host, config.data_port),
        console_url: console_url(&config.host, config.console_port),
    };
    info!(pid, data = %started.data_url, console = %started.console_url, "server ready");
    Ok(started)
}

/// Asks the server described by `config` to stop.
///
/// # Errors
///
/// Returns a `Configuration` error for invalid settings and a
/// `ShutdownFailed` error when nothing is listening, the request is refused,
/// or the server does not release its port within the shutdown timeout.
pub fn stop_server(config: &ServerConfig) -> Result<(), LifecycleError> {
    config.validate()?;
    let runtime = ServerRuntime::from_config(config)?;
    let request = ShutdownRequest::from_config(config);
    debug!(state = "stopping", endpoint = %request.endpoint(), "server lifecycle transition");
    request_shutdown(&runtime, &request, config.shutdown_timeout())
}

/// Probes both listeners of the server described by `config`.
///
/// # Errors
///
/// Returns an error if a probe fails for a reason other than a refused
/// connection.
pub fn server_status(config: &ServerConfig) -> Result<ServerStatus, LifecycleError> {
    Ok(ServerStatus {
        data_url: shutdown_url(&config.host, config.data_port),
        data_listening: port_is_reachable(&config.host, config.data_port)?,
        console_url: console_url(&config.host, config.console_port),
        console_listening: port_is_reachable(&config.host, config.console_port)?,
    })
}

fn console_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}")
}
