//! Effective global configuration
//!
//! Passed explicitly to every decision. The host reloads it between
//! evaluation passes; it is never mutated while a decision runs.

use serde::{Deserialize, Serialize};

/// How agent environment variables reach the application process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvInjectionMethod {
    Loader,
    PodManifest,
    LoaderFallbackToPodManifest,
}

/// Injection method actually used for one container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvInjectionDecision {
    Loader,
    PodManifest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sHealthProbesSampling {
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Percentage (0-100) of kubelet probe traces to keep
    #[serde(default)]
    pub keep_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingConfig {
    #[serde(default)]
    pub k8s_health_probes_sampling: Option<K8sHealthProbesSampling>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    #[serde(default)]
    pub ignored_containers: Vec<String>,
    #[serde(default)]
    pub allow_concurrent_agents: Option<bool>,
    #[serde(default)]
    pub agent_env_vars_injection_method: Option<EnvInjectionMethod>,
    #[serde(default)]
    pub sampling: Option<SamplingConfig>,
}

impl EffectiveConfig {
    pub fn is_container_ignored(&self, container_name: &str) -> bool {
        self.ignored_containers.iter().any(|c| c == container_name)
    }

    pub fn concurrent_agents_allowed(&self) -> bool {
        self.allow_concurrent_agents.unwrap_or(false)
    }

    fn health_probes_sampling(&self) -> Option<&K8sHealthProbesSampling> {
        self.sampling
            .as_ref()
            .and_then(|s| s.k8s_health_probes_sampling.as_ref())
    }

    pub fn health_probes_sampling_enabled(&self) -> bool {
        self.health_probes_sampling()
            .and_then(|s| s.enabled)
            .unwrap_or(false)
    }

    /// Fraction of kubelet probe traces to keep, 0 when unset
    pub fn health_probes_keep_fraction(&self) -> f64 {
        self.health_probes_sampling()
            .and_then(|s| s.keep_percentage)
            .map(percentage_to_fraction)
            .unwrap_or(0.0)
    }
}

/// Converts a 0-100 percentage to a 0.0-1.0 fraction, clamping out-of-range input
pub fn percentage_to_fraction(percentage: f64) -> f64 {
    if percentage.is_nan() || percentage < 0.0 {
        0.0
    } else if percentage > 100.0 {
        1.0
    } else {
        percentage / 100.0
    }
}
