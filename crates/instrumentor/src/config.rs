//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Instrumentor service configuration, read from `INSTRUMENTOR_*` variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name attached to every structured log event
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health/metrics/evaluation
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Cluster state snapshot (JSON, or YAML by extension)
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Distro catalog YAML. The built-in community catalog is used when unset.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Seconds between full evaluation passes
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,
}

fn default_instance_name() -> String {
    std::env::var("POD_NAME").unwrap_or_else(|_| "instrumentor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("/etc/instrumentor/snapshot.yaml")
}

fn default_resync_interval() -> u64 {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            snapshot_path: default_snapshot_path(),
            catalog_path: None,
            resync_interval_secs: default_resync_interval(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("INSTRUMENTOR"))
            .build()
            .context("failed to read INSTRUMENTOR_* environment")?;

        config
            .try_deserialize()
            .context("invalid instrumentor configuration")
    }

    pub fn resync_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.resync_interval_secs.max(1))
    }
}
