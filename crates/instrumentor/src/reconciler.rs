//! Evaluation pass over the cluster snapshot
//!
//! One pass reads a snapshot, evaluates every workload in turn, compares each
//! result's agents meta hash with the last persisted one and publishes the
//! results for the API.

use dashmap::DashMap;
use instrumentor_lib::{
    health::{components, HealthRegistry},
    observability::{EnablementMetrics, StructuredLogger},
    reader::{ClusterSnapshot, WorkloadStateReader},
    rollout_required, DistroCatalog, PodWorkload, SnapshotError, WorkloadEvaluation,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Outcome of one full pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub workloads: usize,
    pub enabled_workloads: usize,
    pub rollouts: usize,
}

pub struct Reconciler {
    reader: Arc<dyn WorkloadStateReader>,
    catalog: Arc<DistroCatalog>,
    health: HealthRegistry,
    metrics: EnablementMetrics,
    logger: StructuredLogger,
    /// Hash of the last rollout per workload, standing in for the annotation
    /// the orchestrator persists on the workload
    persisted_hashes: DashMap<PodWorkload, String>,
    evaluations: DashMap<PodWorkload, WorkloadEvaluation>,
}

impl Reconciler {
    pub fn new(
        reader: Arc<dyn WorkloadStateReader>,
        catalog: Arc<DistroCatalog>,
        health: HealthRegistry,
        metrics: EnablementMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            reader,
            catalog,
            health,
            metrics,
            logger,
            persisted_hashes: DashMap::new(),
            evaluations: DashMap::new(),
        }
    }

    pub fn catalog(&self) -> &DistroCatalog {
        &self.catalog
    }

    /// Reads a fresh snapshot and evaluates it. On a read failure the
    /// results of the previous pass stay published.
    pub async fn run_pass(&self) -> Result<PassSummary, SnapshotError> {
        let snapshot = match self.reader.read_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.metrics.inc_snapshot_errors();
                if self.evaluations.is_empty() {
                    self.health
                        .set_unhealthy(components::STATE_READER, err.to_string())
                        .await;
                } else {
                    self.health
                        .set_degraded(
                            components::STATE_READER,
                            format!("serving previous results: {err}"),
                        )
                        .await;
                }
                return Err(err);
            }
        };
        self.health.set_healthy(components::STATE_READER).await;

        let summary = self.reconcile(&snapshot);

        self.health.set_healthy(components::EVALUATOR).await;
        self.health.set_ready(true).await;
        Ok(summary)
    }

    /// Evaluates every workload of the snapshot sequentially and records
    /// hashes and results
    pub fn reconcile(&self, snapshot: &ClusterSnapshot) -> PassSummary {
        let ctx = snapshot.context(&self.catalog);
        let mut summary = PassSummary::default();
        let mut evaluations = Vec::with_capacity(snapshot.workloads.len());

        for state in &snapshot.workloads {
            let start = Instant::now();
            let evaluation = instrumentor_lib::evaluate_workload(state, &ctx);
            self.metrics
                .observe_evaluation_latency(start.elapsed().as_secs_f64());
            self.logger.log_evaluation(&evaluation);

            let previous = self
                .persisted_hashes
                .get(&state.workload)
                .map(|h| h.value().clone())
                .or_else(|| state.agents_meta_hash.clone());

            if rollout_required(previous.as_deref(), &evaluation) {
                self.metrics.inc_rollouts_triggered();
                self.logger
                    .log_rollout_triggered(&evaluation, previous.as_deref());
                summary.rollouts += 1;
            }

            // an empty hash is kept so the snapshot value only seeds the first pass
            self.persisted_hashes.insert(
                state.workload.clone(),
                evaluation.agents_meta_hash.clone().unwrap_or_default(),
            );

            summary.workloads += 1;
            if evaluation.agent_injection_enabled {
                summary.enabled_workloads += 1;
            }
            evaluations.push(evaluation);
        }

        self.metrics.set_containers_by_reason(&evaluations);

        // workloads gone from the snapshot are dropped from the results
        self.evaluations
            .retain(|workload, _| snapshot.workload(workload).is_some());
        self.persisted_hashes
            .retain(|workload, _| snapshot.workload(workload).is_some());
        for evaluation in evaluations {
            self.evaluations
                .insert(evaluation.workload.clone(), evaluation);
        }

        debug!(
            workloads = summary.workloads,
            enabled = summary.enabled_workloads,
            rollouts = summary.rollouts,
            "Evaluation pass complete"
        );
        summary
    }

    /// Evaluates a caller-provided snapshot without touching stored state
    pub fn evaluate_detached(&self, snapshot: &ClusterSnapshot) -> Vec<WorkloadEvaluation> {
        let evaluations = snapshot.evaluate_all(&self.catalog);
        if evaluations.is_empty() {
            warn!("Detached evaluation requested for a snapshot without workloads");
        }
        evaluations
    }

    /// Latest results, ordered by workload
    pub fn evaluations(&self) -> Vec<WorkloadEvaluation> {
        let mut all: Vec<WorkloadEvaluation> =
            self.evaluations.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.workload.cmp(&b.workload));
        all
    }

    pub fn evaluation(&self, workload: &PodWorkload) -> Option<WorkloadEvaluation> {
        self.evaluations.get(workload).map(|e| e.value().clone())
    }
}
