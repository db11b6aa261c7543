//! Workload state reader
//!
//! The decision engine never reads anything itself; a reader pre-fetches a
//! consistent snapshot of every input and the host evaluates from it.

use crate::config::EffectiveConfig;
use crate::distro::DistroCatalog;
use crate::enablement::{evaluate_workload, EvaluationContext, WorkloadEvaluation, WorkloadState};
use crate::error::SnapshotError;
use crate::models::{NodeCollectorsGroup, PodWorkload};
use crate::rules::{InstrumentationRule, Sampling};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Every input of a full evaluation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub config: EffectiveConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_collectors_group: Option<NodeCollectorsGroup>,
    #[serde(default)]
    pub instrumentation_rules: Vec<InstrumentationRule>,
    #[serde(default)]
    pub sampling_rules: Vec<Sampling>,
    #[serde(default)]
    pub workloads: Vec<WorkloadState>,
}

impl ClusterSnapshot {
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SnapshotError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parses by file extension: `.yaml`/`.yml` as YAML, anything else as JSON
    pub fn parse_for_path(path: &Path, contents: &str) -> Result<Self, SnapshotError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(contents),
            _ => Self::from_json_str(contents),
        }
    }

    pub fn context<'a>(&'a self, catalog: &'a DistroCatalog) -> EvaluationContext<'a> {
        EvaluationContext {
            config: &self.config,
            catalog,
            node_collectors_group: self.node_collectors_group.as_ref(),
            instrumentation_rules: &self.instrumentation_rules,
            sampling_rules: &self.sampling_rules,
        }
    }

    pub fn workload(&self, workload: &PodWorkload) -> Option<&WorkloadState> {
        self.workloads.iter().find(|w| &w.workload == workload)
    }

    /// Evaluates every workload one after another
    pub fn evaluate_all(&self, catalog: &DistroCatalog) -> Vec<WorkloadEvaluation> {
        let ctx = self.context(catalog);
        self.workloads
            .iter()
            .map(|state| evaluate_workload(state, &ctx))
            .collect()
    }
}

/// Source of cluster state for the host loop
#[async_trait]
pub trait WorkloadStateReader: Send + Sync {
    async fn read_snapshot(&self) -> Result<ClusterSnapshot, SnapshotError>;
}

/// Reads a snapshot file written by an exporter or by hand
pub struct FileSnapshotReader {
    path: PathBuf,
}

impl FileSnapshotReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WorkloadStateReader for FileSnapshotReader {
    async fn read_snapshot(&self) -> Result<ClusterSnapshot, SnapshotError> {
        let contents =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| SnapshotError::Io {
                    path: self.path.clone(),
                    source,
                })?;
        ClusterSnapshot::parse_for_path(&self.path, &contents)
    }
}
