//! Commands that evaluate a snapshot file on this machine

use anyhow::{Context, Result};
use instrumentor_lib::{evaluate_workload, WorkloadEvaluation};
use std::path::Path;

use super::{load_catalog, load_snapshot, parse_workload};
use crate::output::{print_evaluation, print_evaluations, print_sampling, OutputFormat};

async fn evaluate_one(
    snapshot_path: &Path,
    catalog_path: Option<&Path>,
    workload: &str,
) -> Result<WorkloadEvaluation> {
    let workload = parse_workload(workload)?;
    let catalog = load_catalog(catalog_path)?;
    let snapshot = load_snapshot(snapshot_path).await?;

    let state = snapshot
        .workload(&workload)
        .with_context(|| format!("Workload {workload} is not in the snapshot"))?;
    Ok(evaluate_workload(state, &snapshot.context(&catalog)))
}

/// Describe agent enablement for one workload, or all of them
pub async fn describe(
    snapshot_path: &Path,
    catalog_path: Option<&Path>,
    workload: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    match workload {
        Some(workload) => {
            let evaluation = evaluate_one(snapshot_path, catalog_path, workload).await?;
            print_evaluation(&evaluation, format)
        }
        None => {
            let catalog = load_catalog(catalog_path)?;
            let snapshot = load_snapshot(snapshot_path).await?;
            print_evaluations(&snapshot.evaluate_all(&catalog), format)
        }
    }
}

/// Show compiled head and tail sampling for one workload
pub async fn sampling(
    snapshot_path: &Path,
    catalog_path: Option<&Path>,
    workload: &str,
    format: OutputFormat,
) -> Result<()> {
    let evaluation = evaluate_one(snapshot_path, catalog_path, workload).await?;
    print_sampling(&evaluation, format)
}
