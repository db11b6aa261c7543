//! Commands that query a running instrumentor service

use anyhow::Result;
use std::path::Path;

use super::{load_snapshot, parse_workload};
use crate::client::ApiClient;
use crate::output::{print_evaluation, print_evaluations, OutputFormat};

pub async fn list(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let evaluations = client.list_workloads().await?;
    print_evaluations(&evaluations, format)
}

pub async fn get(client: &ApiClient, workload: &str, format: OutputFormat) -> Result<()> {
    let workload = parse_workload(workload)?;
    let evaluation = client.get_workload(&workload).await?;
    print_evaluation(&evaluation, format)
}

/// Send a local snapshot to the service and print its decisions
pub async fn evaluate(client: &ApiClient, snapshot_path: &Path, format: OutputFormat) -> Result<()> {
    let snapshot = load_snapshot(snapshot_path).await?;
    let evaluations = client.evaluate(&snapshot).await?;
    print_evaluations(&evaluations, format)
}
