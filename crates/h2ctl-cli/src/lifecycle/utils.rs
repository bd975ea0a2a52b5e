//! Output helpers shared by the lifecycle controller.

use std::io::Write;

use super::LifecycleOutput;
use super::error::LifecycleError;
use super::orchestrator::{ServerStatus, StartedServer};

pub(super) fn write_startup_banner<W: Write, E: Write>(
    output: &mut LifecycleOutput<W, E>,
    server: &StartedServer,
) -> Result<(), LifecycleError> {
    output.stdout_line(format_args!("server ready (pid {})", server.pid))?;
    output.stdout_line(format_args!("  data:    {}", server.data_url))?;
    output.stdout_line(format_args!("  console: {}", server.console_url))
}

pub(super) fn write_status<W: Write, E: Write>(
    output: &mut LifecycleOutput<W, E>,
    status: &ServerStatus,
) -> Result<(), LifecycleError> {
    if status.is_stopped() {
        return output.stdout_line(format_args!(
            "server is not running; use 'h2ctl start' to launch it."
        ));
    }
    output.stdout_line(format_args!(
        "data listener {}: {}",
        status.data_url,
        listening_label(status.data_listening)
    ))?;
    output.stdout_line(format_args!(
        "console listener {}: {}",
        status.console_url,
        listening_label(status.console_listening)
    ))
}

const fn listening_label(listening: bool) -> &'static str {
    if listening { "listening" } else { "not listening" }
}
