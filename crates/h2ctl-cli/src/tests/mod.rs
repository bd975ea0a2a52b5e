//! Crate-internal tests for the CLI runtime and lifecycle flows.

pub(crate) mod support;
