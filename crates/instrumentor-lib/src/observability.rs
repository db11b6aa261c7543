//! Prometheus metrics and structured log events for enablement passes

use crate::enablement::WorkloadEvaluation;
use crate::models::{AgentEnabledReason, ConditionStatus};
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge_vec, Histogram, IntCounter,
    IntGaugeVec,
};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Evaluations are pure CPU work, so buckets start well below a millisecond
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5,
];

static GLOBAL_METRICS: OnceLock<EnablementMetricsInner> = OnceLock::new();

struct EnablementMetricsInner {
    evaluation_latency_seconds: Histogram,
    workloads_evaluated: IntCounter,
    containers_by_reason: IntGaugeVec,
    rollouts_triggered: IntCounter,
    snapshot_errors: IntCounter,
}

impl EnablementMetricsInner {
    fn new() -> Self {
        Self {
            evaluation_latency_seconds: register_histogram!(
                "instrumentor_evaluation_latency_seconds",
                "Time spent evaluating agent enablement for one workload",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register evaluation_latency_seconds"),

            workloads_evaluated: register_int_counter!(
                "instrumentor_workloads_evaluated_total",
                "Total number of workload evaluations"
            )
            .expect("Failed to register workloads_evaluated"),

            containers_by_reason: register_int_gauge_vec!(
                "instrumentor_containers_by_reason",
                "Containers per agent enablement reason in the last full pass",
                &["reason"]
            )
            .expect("Failed to register containers_by_reason"),

            rollouts_triggered: register_int_counter!(
                "instrumentor_rollouts_triggered_total",
                "Workloads whose agents meta hash changed"
            )
            .expect("Failed to register rollouts_triggered"),

            snapshot_errors: register_int_counter!(
                "instrumentor_snapshot_errors_total",
                "Failures reading the cluster state snapshot"
            )
            .expect("Failed to register snapshot_errors"),
        }
    }
}

/// Handle to the process-wide enablement metrics. Clones share the same
/// underlying collectors.
#[derive(Clone)]
pub struct EnablementMetrics {
    _private: (),
}

impl Default for EnablementMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EnablementMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EnablementMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EnablementMetricsInner {
        GLOBAL_METRICS.get_or_init(EnablementMetricsInner::new)
    }

    pub fn observe_evaluation_latency(&self, duration_secs: f64) {
        self.inner().evaluation_latency_seconds.observe(duration_secs);
        self.inner().workloads_evaluated.inc();
    }

    /// Replaces the per-reason gauges with the counts of a full pass. A
    /// workload still waiting on prerequisites has no container entries and
    /// counts once under its condition reason.
    pub fn set_containers_by_reason(&self, evaluations: &[WorkloadEvaluation]) {
        let mut counts: HashMap<AgentEnabledReason, i64> = HashMap::new();
        for evaluation in evaluations {
            if evaluation.condition.status == ConditionStatus::Unknown {
                *counts.entry(evaluation.condition.reason).or_default() += 1;
                continue;
            }
            for container in &evaluation.containers {
                *counts.entry(container.agent_enabled_reason).or_default() += 1;
            }
        }

        let gauges = &self.inner().containers_by_reason;
        gauges.reset();
        for (reason, count) in counts {
            gauges.with_label_values(&[reason.as_str()]).set(count);
        }
    }

    pub fn inc_rollouts_triggered(&self) {
        self.inner().rollouts_triggered.inc();
    }

    pub fn inc_snapshot_errors(&self) {
        self.inner().snapshot_errors.inc();
    }
}

/// Consistent structured events for the instrumentor host
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_evaluation(&self, evaluation: &WorkloadEvaluation) {
        let enabled: Vec<&str> = evaluation
            .enabled_containers()
            .map(|c| c.container_name.as_str())
            .collect();

        if evaluation.condition.status == ConditionStatus::Unknown {
            info!(
                event = "agent_enablement_waiting",
                instance = %self.instance,
                workload = %evaluation.workload,
                reason = %evaluation.condition.reason,
                message = %evaluation.condition.message,
                "Waiting for prerequisites before enabling agents"
            );
            return;
        }

        info!(
            event = "agent_enablement_evaluated",
            instance = %self.instance,
            workload = %evaluation.workload,
            status = %evaluation.condition.status,
            reason = %evaluation.condition.reason,
            containers = evaluation.containers.len(),
            enabled_containers = ?enabled,
            agents_meta_hash = ?evaluation.agents_meta_hash,
            "Evaluated agent enablement"
        );
    }

    pub fn log_rollout_triggered(
        &self,
        evaluation: &WorkloadEvaluation,
        previous_hash: Option<&str>,
    ) {
        warn!(
            event = "rollout_hash_changed",
            instance = %self.instance,
            workload = %evaluation.workload,
            previous_hash = ?previous_hash,
            current_hash = ?evaluation.agents_meta_hash,
            "Agent configuration changed, workload rollout required"
        );
    }

    pub fn log_startup(&self, version: &str, distros: usize) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            distros = distros,
            "Instrumentor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Instrumentor shutting down"
        );
    }
}
