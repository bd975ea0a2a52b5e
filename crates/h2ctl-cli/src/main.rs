//! CLI entrypoint for `h2ctl`.
//!
//! The binary delegates to [`h2ctl_cli::run`], which loads configuration,
//! parses the lifecycle subcommand and drives the server.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Unlocked handles: output relay threads log to stderr concurrently.
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    h2ctl_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
