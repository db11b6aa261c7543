//! Sampling rule compiler
//!
//! Per enabled container, splits the user's sampling policy between the
//! agent (head sampling) and the collector (tail sampling).

mod head;
mod scope;
mod tail;

pub use head::{compile_head_sampling, kubelet_probe_paths};
pub use scope::is_in_scope;
pub use tail::{
    filter_tail_sampling, TailCostReductionRule, TailHighlyRelevantOperation, TailNoisyOperation,
    TailSamplingRules,
};

use crate::config::EffectiveConfig;
use crate::distro::OtelDistro;
use crate::models::{HeadSamplingConfig, PodWorkload};
use crate::rules::Sampling;
use k8s_openapi::api::core::v1::PodSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSampling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_sampling: Option<HeadSamplingConfig>,
    #[serde(default)]
    pub tail_sampling: TailSamplingRules,
}

/// Head and tail sampling for one enabled container
pub fn compile_container_sampling(
    distro: &OtelDistro,
    config: &EffectiveConfig,
    sampling_rules: &[Sampling],
    workload: &PodWorkload,
    container_name: &str,
    pod_spec: Option<&PodSpec>,
) -> ContainerSampling {
    ContainerSampling {
        head_sampling: compile_head_sampling(
            distro,
            config,
            sampling_rules,
            workload,
            container_name,
            pod_spec,
        ),
        tail_sampling: filter_tail_sampling(distro, sampling_rules, workload, container_name),
    }
}
