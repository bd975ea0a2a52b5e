//! Remote shutdown of a running server.
//!
//! The request is delivered by running the server tool in client mode with
//! the `-tcpShutdown` argument vector, which speaks the server's own protocol
//! and authenticates with the data password.

use std::io::BufReader;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use h2ctl_config::{ServerConfig, ServerRuntime, shutdown_args, shutdown_url};
use tracing::{debug, info};

use super::error::LifecycleError;
use super::readiness::{OutputSink, SERVER_OUTPUT_TARGET, drain};
use super::socket::port_is_reachable;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Where to send a shutdown request and how to authenticate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownRequest {
    pub host: String,
    pub port: u16,
    pub password: String,
}

impl ShutdownRequest {
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.data_port,
            password: config.data_password.clone(),
        }
    }

    /// URL of the targeted data listener.
    #[must_use]
    pub fn endpoint(&self) -> String {
        shutdown_url(&self.host, self.port)
    }

    fn arguments(&self) -> Vec<String> {
        shutdown_args(&self.host, self.port, &self.password)
    }
}

/// Asks the server behind `request` to stop and waits for its listener to
/// close.
///
/// The data port is probed first so an absent server is reported immediately
/// instead of waiting on a client that cannot connect.
///
/// # Errors
///
/// Returns an error if:
/// - the data port cannot be probed, for example because the host does not
///   resolve (`ShutdownProbe`);
/// - nothing is listening on the target port (`NotListening`);
/// - the client cannot be started (`ShutdownClient`);
/// - the client exits unsuccessfully, for example after a wrong password
///   (`ShutdownRejected`);
/// - the client or the listener release takes longer than `timeout`
///   (`ShutdownTimeout`).
pub fn request_shutdown(
    runtime: &ServerRuntime,
    request: &ShutdownRequest,
    timeout: Duration,
) -> Result<(), LifecycleError> {
    let endpoint = request.endpoint();
    if !listener_is_up(request)? {
        return Err(LifecycleError::NotListening { endpoint });
    }
    let deadline = Instant::now() + timeout;

    debug!(%endpoint, "requesting server shutdown");
    let mut child = Command::new(runtime.java())
        .args(runtime.jvm_arguments())
        .args(request.arguments())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| LifecycleError::ShutdownClient {
            program: runtime.java().clone(),
            source,
        })?;
    let stdout = collect_output(child.stdout.take());
    let stderr = collect_output(child.stderr.take());

    let status = match wait_until(&mut child, deadline) {
        Ok(Some(status)) => status,
        Ok(None) => {
            abandon(&mut child);
            return Err(timed_out(endpoint, timeout));
        }
        Err(source) => {
            abandon(&mut child);
            return Err(LifecycleError::ShutdownClient {
                program: runtime.java().clone(),
                source,
            });
        }
    };

    let stdout = join_output(stdout);
    let stderr = join_output(stderr);
    if !status.success() {
        let detail = first_meaningful_line(&stderr)
            .or_else(|| first_meaningful_line(&stdout))
            .map_or_else(|| format!("client exited with {status}"), str::to_owned);
        return Err(LifecycleError::ShutdownRejected { endpoint, detail });
    }

    if !wait_for_release(request, deadline)? {
        return Err(timed_out(endpoint, timeout));
    }
    info!(%endpoint, "server stopped");
    Ok(())
}

fn timed_out(endpoint: String, timeout: Duration) -> LifecycleError {
    LifecycleError::ShutdownTimeout {
        endpoint,
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Kills and reaps a client that is no longer being waited on.
fn abandon(child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!(%error, "shutdown client already exited");
    }
    let _ = child.wait();
}

/// Probes the data port, reporting failures as shutdown failures.
fn listener_is_up(request: &ShutdownRequest) -> Result<bool, LifecycleError> {
    port_is_reachable(&request.host, request.port).map_err(|error| match error {
        LifecycleError::SocketProbe { endpoint, source } => {
            LifecycleError::ShutdownProbe { endpoint, source }
        }
        other => other,
    })
}

/// Polls the child until it exits or `deadline` passes.
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Polls the data port until nothing accepts connections on it.
fn wait_for_release(request: &ShutdownRequest, deadline: Instant) -> Result<bool, LifecycleError> {
    loop {
        if !listener_is_up(request)? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[derive(Default)]
struct CollectingSink {
    lines: Vec<String>,
}

impl OutputSink for CollectingSink {
    fn line(&mut self, line: &str) {
        info!(target: SERVER_OUTPUT_TARGET, "{line}");
        self.lines.push(line.to_owned());
    }
}

fn collect_output<R>(stream: Option<R>) -> Option<JoinHandle<Vec<String>>>
where
    R: std::io::Read + Send + 'static,
{
    let stream = stream?;
    thread::Builder::new()
        .name(String::from("h2ctl-shutdown-output"))
        .spawn(move || {
            let mut sink = CollectingSink::default();
            drain(&mut BufReader::new(stream), &mut sink);
            sink.lines
        })
        .ok()
}

fn join_output(handle: Option<JoinHandle<Vec<String>>>) -> Vec<String> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn first_meaningful_line(lines: &[String]) -> Option<&str> {
    lines
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
}
