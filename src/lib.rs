//! Live call-tree monitor for a durable function-call harness.
//!
//! Producers report requests, responses and log output to an [`infra::Observer`];
//! the terminal UI in [`app`] and [`ui`] renders the observed calls as one
//! tree per root with attempts, durations and statuses.

pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;
pub mod ui;
