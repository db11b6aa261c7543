pub mod distros;
pub mod local;
pub mod remote;

use anyhow::{Context, Result};
use instrumentor_lib::{
    reader::{ClusterSnapshot, FileSnapshotReader, WorkloadStateReader},
    DistroCatalog, PodWorkload,
};
use std::path::Path;

/// Catalog from a YAML file, or the built-in community catalog
pub fn load_catalog(path: Option<&Path>) -> Result<DistroCatalog> {
    match path {
        Some(path) => DistroCatalog::from_path(path)
            .with_context(|| format!("Failed to load distro catalog {}", path.display())),
        None => DistroCatalog::community().context("Built-in distro catalog is invalid"),
    }
}

pub async fn load_snapshot(path: &Path) -> Result<ClusterSnapshot> {
    FileSnapshotReader::new(path)
        .read_snapshot()
        .await
        .with_context(|| format!("Failed to load snapshot {}", path.display()))
}

pub fn parse_workload(workload: &str) -> Result<PodWorkload> {
    workload
        .parse()
        .with_context(|| format!("Invalid workload {workload:?}, expected namespace/kind/name"))
}
