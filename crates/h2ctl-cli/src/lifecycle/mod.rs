//! Lifecycle management for the database server.
//!
//! This module is split into focused submodules so each concern remains small and
//! testable:
//! - [`types`] defines the user-facing command models and IO helpers.
//! - [`error`] captures the error surface and its coarse classification.
//! - [`readiness`] detects the listener announcements in server output.
//! - [`launcher`] spawns the server process.
//! - [`startup`] supervises a launched process until it is ready or gone.
//! - [`shutdown`] delivers remote shutdown requests.
//! - [`socket`] handles port reachability probing.
//! - [`orchestrator`] composes the start/stop/status flows.
//! - [`controller`] maps CLI commands onto those flows.

mod controller;
mod error;
mod launcher;
mod orchestrator;
#[cfg(all(test, unix))]
mod orchestrator_tests;
mod readiness;
mod shutdown;
mod socket;
mod startup;
mod types;
mod utils;

pub use controller::SystemLifecycle;
pub use error::{FailureKind, LifecycleError, Listener};
pub use orchestrator::{
    ServerStatus, StartedServer, server_status, start_server, start_server_with_sink, stop_server,
};
pub use readiness::{
    LaunchFailure, MarkerSet, OutputSink, PrematureClose, ReadinessMarker, ReadinessOutcome,
    SERVER_OUTPUT_TARGET, TracingSink, await_ready, drain,
};
pub use shutdown::{ShutdownRequest, request_shutdown};
pub use types::{LifecycleCommand, LifecycleContext, LifecycleOutput};
