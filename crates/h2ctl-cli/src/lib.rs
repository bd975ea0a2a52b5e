//! Command-line runtime for managing an embedded H2 database server.
//!
//! The crate owns argument parsing, configuration bootstrapping, logging
//! setup, and the server lifecycle: launching the process, detecting
//! readiness from its output, and requesting remote shutdown. The runtime can
//! be exercised from the binary entrypoint or from tests where configuration
//! loading, lifecycle handling and IO streams are substituted.
//!
//! Host programs that embed the lifecycle directly use [`start_server`],
//! [`stop_server`] and [`server_status`] with an
//! [`h2ctl_config::ServerConfig`].

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

mod cli;
mod config;
mod errors;
mod lifecycle;
pub mod telemetry;
#[cfg(test)]
mod tests;

use cli::Cli;
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
pub use lifecycle::{
    FailureKind, LaunchFailure, LifecycleCommand, LifecycleContext, LifecycleError,
    LifecycleOutput, Listener, MarkerSet, OutputSink, PrematureClose, ReadinessMarker,
    ReadinessOutcome, SERVER_OUTPUT_TARGET, ServerStatus, ShutdownRequest, StartedServer,
    SystemLifecycle, TracingSink, await_ready, drain, request_shutdown, server_status,
    start_server, start_server_with_sink, stop_server,
};

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: This list must be kept in sync with the fields of
/// `h2ctl_config::ServerConfig`. When adding new configuration options,
/// update this array accordingly.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--data-port",
    "--data-password",
    "--console-port",
    "--console-password",
    "--create-if-missing",
    "--allow-remote-data-connections",
    "--allow-remote-console-connections",
    "--open-console-in-browser",
    "--runtime-artifact",
    "--host",
    "--java-binary",
    "--classpath",
    "--main-class",
    "--base-dir",
    "--startup-timeout-ms",
    "--shutdown-timeout-ms",
    "--log-filter",
    "--log-format",
];

/// Entries of [`CONFIG_CLI_FLAGS`] that hold an on/off `Toggle`.
const TOGGLE_CLI_FLAGS: &[&str] = &[
    "--create-if-missing",
    "--allow-remote-data-connections",
    "--allow-remote-console-connections",
    "--open-console-in-browser",
];

/// Bundles the IO streams provided to the CLI runtime.
///
/// Lifecycle commands receive a short-lived [`LifecycleOutput`] wrapper that
/// borrows these streams.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: &'a mut IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut lifecycle = SystemLifecycle;
        self.run_with_handler(args, |command, context, output| {
            lifecycle.handle(command, context, output)
        })
    }

    fn run_with_handler<I, F>(&mut self, args: I, mut handler: F) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        F: FnMut(
            LifecycleCommand,
            LifecycleContext<'_>,
            &mut LifecycleOutput<&mut W, &mut E>,
        ) -> Result<ExitCode, LifecycleError>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) if is_informational(&error) => {
                let _ = write!(self.io.stdout, "{error}");
                return ExitCode::SUCCESS;
            }
            Err(error) => {
                let _ = write!(self.io.stderr, "{}", AppError::CliUsage(error));
                return ExitCode::FAILURE;
            }
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| {
                telemetry::initialise(&config)?;
                let command = LifecycleCommand::from(cli.action);
                let context = LifecycleContext { config: &config };
                let mut output = LifecycleOutput::new(&mut *self.io.stdout, &mut *self.io.stderr);
                handler(command, context, &mut output)
                    .map_err(|source| AppError::Lifecycle { command, source })
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<'a, I, W, E, L>(
    args: I,
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}

#[cfg(test)]
pub(crate) fn run_with_handler<'a, I, W, E, L, F>(
    args: I,
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
    handler: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    F: FnMut(
        LifecycleCommand,
        LifecycleContext<'_>,
        &mut LifecycleOutput<&mut W, &mut E>,
    ) -> Result<ExitCode, LifecycleError>,
{
    CliRunner::new(io, loader).run_with_handler(args, handler)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    if let Some(rest) = args.get(split.command_start..) {
        cli_arguments.extend(rest.iter().cloned());
    }
    cli_arguments
}

fn is_informational(error: &clap::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
    )
}
