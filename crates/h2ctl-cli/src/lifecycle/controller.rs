//! High-level orchestration for server lifecycle commands.
//!
//! This module wires the start/stop/status flows to the CLI output streams so
//! the runtime drives a single entrypoint when managing the server.

use std::io::Write;
use std::process::ExitCode;

use super::error::LifecycleError;
use super::orchestrator::{server_status, start_server, stop_server};
use super::shutdown::ShutdownRequest;
use super::types::{LifecycleCommand, LifecycleContext, LifecycleOutput};
use super::utils::{write_startup_banner, write_status};

/// Production lifecycle controller.
#[derive(Debug, Default)]
pub struct SystemLifecycle;

impl SystemLifecycle {
    pub fn handle<W: Write, E: Write>(
        &mut self,
        command: LifecycleCommand,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        match command {
            LifecycleCommand::Start => self.start(context, output),
            LifecycleCommand::Stop => self.stop(context, output),
            LifecycleCommand::Status => self.status(context, output),
        }
    }

    fn start<W: Write, E: Write>(
        &mut self,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let server = start_server(context.config)?;
        write_startup_banner(output, &server)?;
        Ok(ExitCode::SUCCESS)
    }

    fn stop<W: Write, E: Write>(
        &mut self,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        stop_server(context.config)?;
        output.stdout_line(format_args!(
            "server at {} stopped",
            ShutdownRequest::from_config(context.config).endpoint()
        ))?;
        Ok(ExitCode::SUCCESS)
    }

    fn status<W: Write, E: Write>(
        &mut self,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let status = server_status(context.config)?;
        write_status(output, &status)?;
        Ok(ExitCode::SUCCESS)
    }
}
