//! Instrumentor host service
//!
//! Reads cluster state snapshots, runs the agent enablement evaluation and
//! serves the results next to health and metrics endpoints.

pub mod api;
pub mod config;
pub mod reconciler;
