//! CLI argument definitions for `h2ctl`.
//!
//! Configuration flags such as `--data-port` are consumed by the layered
//! configuration loader before clap runs, so this parser only sees the
//! lifecycle subcommand.

use clap::{Parser, Subcommand};

/// Starts, stops and inspects an embedded H2 database server.
#[derive(Parser, Debug)]
#[command(
    name = "h2ctl",
    version,
    disable_help_subcommand = true,
    after_help = "Configuration flags (for example --data-port 9092) must precede the subcommand."
)]
pub(crate) struct Cli {
    /// The lifecycle action to perform.
    #[command(subcommand)]
    pub(crate) action: ServerAction,
}

/// Server lifecycle actions.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServerAction {
    /// Starts the server and waits until both listeners are up.
    Start,
    /// Asks a running server to shut down.
    Stop,
    /// Reports whether the server's listeners accept connections.
    Status,
}
