//! User-declared rules: instrumentation overrides and sampling policy

use crate::models::{PodWorkload, ProgrammingLanguage, WorkloadKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentationLibraryId {
    pub name: String,
    pub language: ProgrammingLanguage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtelDistros {
    #[serde(default)]
    pub otel_distro_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceConfig {
    #[serde(default)]
    pub disabled: Option<bool>,
}

/// User override applied to the workloads it selects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentationRule {
    /// Object name, unique within the cluster
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    /// `None` selects every workload, an empty list selects none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workloads: Option<Vec<PodWorkload>>,
    /// `None` makes this a workload-level rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrumentation_libraries: Option<Vec<InstrumentationLibraryId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otel_distros: Option<OtelDistros>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_config: Option<TraceConfig>,
}

impl InstrumentationRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule_name: None,
            disabled: false,
            workloads: None,
            instrumentation_libraries: None,
            otel_distros: None,
            trace_config: None,
        }
    }

    pub fn applies_to(&self, workload: &PodWorkload) -> bool {
        if self.disabled {
            return false;
        }
        match &self.workloads {
            None => true,
            Some(workloads) => workloads.contains(workload),
        }
    }

    pub fn is_workload_level(&self) -> bool {
        self.instrumentation_libraries.is_none()
    }

    pub fn disables_traces(&self) -> bool {
        self.trace_config
            .as_ref()
            .and_then(|t| t.disabled)
            .unwrap_or(false)
    }

    /// Ordering key used to resolve conflicting overrides deterministically
    pub fn priority_key(&self) -> (&str, &str) {
        (self.rule_name.as_deref().unwrap_or(""), self.name.as_str())
    }
}

/// Selects the workloads, containers and languages a sampling rule applies to.
/// Unset fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_kind: Option<WorkloadKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_language: Option<ProgrammingLanguage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadSamplingHttpServerOperationMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadSamplingHttpClientOperationMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadSamplingOperationMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_server: Option<HeadSamplingHttpServerOperationMatcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_client: Option<HeadSamplingHttpClientOperationMatcher>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailSamplingHttpServerOperationMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KafkaOperationMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka_topic: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailSamplingOperationMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_server: Option<TailSamplingHttpServerOperationMatcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka_consumer: Option<KafkaOperationMatcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka_producer: Option<KafkaOperationMatcher>,
}

/// Operations with little observability value, dropped as early as possible
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoisyOperation {
    #[serde(default)]
    pub source_scopes: Vec<SourceScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<HeadSamplingOperationMatcher>,
    /// Keep at most this percentage of matching traces; unset keeps none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_at_most: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Operations whose traces are kept regardless of cost reduction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlyRelevantOperation {
    #[serde(default)]
    pub source_scopes: Vec<SourceScope>,
    #[serde(default)]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_at_least_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<TailSamplingOperationMatcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_at_least: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostReductionRule {
    #[serde(default)]
    pub source_scopes: Vec<SourceScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<TailSamplingOperationMatcher>,
    pub percentage_at_most: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One sampling policy object. Many objects are joined into the global policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sampling {
    pub name: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub noisy_operations: Vec<NoisyOperation>,
    #[serde(default)]
    pub highly_relevant_operations: Vec<HighlyRelevantOperation>,
    #[serde(default)]
    pub cost_reduction_rules: Vec<CostReductionRule>,
}
