//! Instrumentor - agent enablement decisions for instrumented workloads
//!
//! Periodically reads the cluster state snapshot, decides which containers
//! get an OpenTelemetry agent and reports workloads that need a rollout.

use anyhow::{Context, Result};
use instrumentor::{api, config::ServiceConfig, reconciler::Reconciler};
use instrumentor_lib::{
    health::{components, HealthRegistry},
    observability::{EnablementMetrics, StructuredLogger},
    reader::FileSnapshotReader,
    DistroCatalog,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServiceConfig::load()?;
    info!(
        instance = %config.instance_name,
        snapshot_path = %config.snapshot_path.display(),
        "Instrumentor configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::STATE_READER).await;
    health_registry.register(components::DISTRO_CATALOG).await;
    health_registry.register(components::EVALUATOR).await;

    let catalog = match &config.catalog_path {
        Some(path) => DistroCatalog::from_path(path)
            .with_context(|| format!("failed to load distro catalog {}", path.display()))?,
        None => DistroCatalog::community().context("built-in distro catalog is invalid")?,
    };

    let metrics = EnablementMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(SERVICE_VERSION, catalog.len());

    let reconciler = Arc::new(Reconciler::new(
        Arc::new(FileSnapshotReader::new(&config.snapshot_path)),
        Arc::new(catalog),
        health_registry.clone(),
        metrics.clone(),
        logger.clone(),
    ));

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        reconciler.clone(),
    ));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let mut resync = tokio::time::interval(config.resync_interval());
    loop {
        tokio::select! {
            _ = resync.tick() => {
                match reconciler.run_pass().await {
                    Ok(summary) => info!(
                        workloads = summary.workloads,
                        enabled = summary.enabled_workloads,
                        rollouts = summary.rollouts,
                        "Resync complete"
                    ),
                    Err(err) => warn!(error = %err, "Failed to read cluster state snapshot"),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                logger.log_shutdown("SIGINT received");
                break;
            }
        }
    }

    api_handle.abort();
    Ok(())
}
