//! Server process spawning.

use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};

use h2ctl_config::ServerRuntime;
use tracing::debug;

use super::error::LifecycleError;

/// A freshly spawned server with its output pipes detached from the handle.
pub(super) struct LaunchedServer {
    pub(super) child: Child,
    pub(super) stdout: ChildStdout,
    pub(super) stderr: Option<ChildStderr>,
}

/// Spawns `<java> -cp <classpath> <main class> <server arguments>`.
///
/// Standard output is piped for readiness detection and standard error is
/// piped for diagnostics. Standard input is closed.
pub(super) fn launch(
    runtime: &ServerRuntime,
    server_arguments: &[String],
) -> Result<LaunchedServer, LifecycleError> {
    let mut command = Command::new(runtime.java());
    command
        .args(runtime.jvm_arguments())
        .args(server_arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|source| LifecycleError::Launch {
        program: runtime.java().clone(),
        source,
    })?;
    debug!(pid = child.id(), main_class = runtime.main_class(), "spawned server process");

    let Some(stdout) = child.stdout.take() else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(LifecycleError::Launch {
            program: runtime.java().clone(),
            source: std::io::Error::other("server stdout was not captured"),
        });
    };
    let stderr = child.stderr.take();
    Ok(LaunchedServer {
        child,
        stdout,
        stderr,
    })
}
