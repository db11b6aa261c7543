//! Agent enablement and sampling decisions for instrumented workloads
//!
//! This crate provides:
//! - The distribution catalog and runtime parameter resolution
//! - The per-workload agent enablement decision engine
//! - Head and tail sampling rule compilation
//! - Snapshot readers, health checks and observability for the host

pub mod config;
pub mod distro;
pub mod enablement;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod reader;
pub mod rules;
pub mod sampling;

pub use config::EffectiveConfig;
pub use distro::{DistroCatalog, OtelDistro};
pub use enablement::{
    evaluate_workload, rollout_required, EvaluationContext, WorkloadEvaluation, WorkloadState,
};
pub use error::{CatalogError, SnapshotError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EnablementMetrics, StructuredLogger};
pub use reader::{ClusterSnapshot, FileSnapshotReader, WorkloadStateReader};
