//! Sampling rules handed to the collector for one container

use super::scope::is_in_scope;
use crate::distro::OtelDistro;
use crate::models::PodWorkload;
use crate::rules::{HeadSamplingOperationMatcher, Sampling, TailSamplingOperationMatcher};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailNoisyOperation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<HeadSamplingOperationMatcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_at_most: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailHighlyRelevantOperation {
    #[serde(default)]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_at_least_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<TailSamplingOperationMatcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_at_least: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailCostReductionRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<TailSamplingOperationMatcher>,
    pub percentage_at_most: f64,
}

/// Rules in scope for a container, with scopes and notes stripped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailSamplingRules {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub noisy_operations: Vec<TailNoisyOperation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highly_relevant_operations: Vec<TailHighlyRelevantOperation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cost_reduction_rules: Vec<TailCostReductionRule>,
}

impl TailSamplingRules {
    pub fn is_empty(&self) -> bool {
        self.noisy_operations.is_empty()
            && self.highly_relevant_operations.is_empty()
            && self.cost_reduction_rules.is_empty()
    }
}

/// Filters the sampling rules down to those the collector applies for this
/// container. Noisy operations are only included when the agent cannot drop
/// them itself.
pub fn filter_tail_sampling(
    distro: &OtelDistro,
    sampling_rules: &[Sampling],
    workload: &PodWorkload,
    container_name: &str,
) -> TailSamplingRules {
    let language = distro.language;
    let include_noisy = !distro.supports_head_sampling();
    let mut rules = TailSamplingRules::default();

    for sampling in sampling_rules.iter().filter(|s| !s.disabled) {
        if include_noisy {
            rules.noisy_operations.extend(
                sampling
                    .noisy_operations
                    .iter()
                    .filter(|op| is_in_scope(&op.source_scopes, workload, container_name, language))
                    .map(|op| TailNoisyOperation {
                        operation: op.operation.clone(),
                        percentage_at_most: op.percentage_at_most,
                    }),
            );
        }

        rules.highly_relevant_operations.extend(
            sampling
                .highly_relevant_operations
                .iter()
                .filter(|op| is_in_scope(&op.source_scopes, workload, container_name, language))
                .map(|op| TailHighlyRelevantOperation {
                    error: op.error,
                    duration_at_least_ms: op.duration_at_least_ms,
                    operation: op.operation.clone(),
                    percentage_at_least: op.percentage_at_least,
                }),
        );

        rules.cost_reduction_rules.extend(
            sampling
                .cost_reduction_rules
                .iter()
                .filter(|rule| is_in_scope(&rule.source_scopes, workload, container_name, language))
                .map(|rule| TailCostReductionRule {
                    operation: rule.operation.clone(),
                    percentage_at_most: rule.percentage_at_most,
                }),
        );
    }

    rules
}
