//! Core data models for agent enablement
//!
//! These are the in-memory data contracts exchanged with the workload state
//! reader (inputs) and the admission webhook / rollout orchestrator (outputs).
//! Field names serialize in camelCase to match the Kubernetes representation.

use crate::error::ParseModelError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Kind of a Kubernetes workload that owns pods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
            WorkloadKind::Job => "Job",
            WorkloadKind::CronJob => "CronJob",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deployment" => Ok(WorkloadKind::Deployment),
            "statefulset" => Ok(WorkloadKind::StatefulSet),
            "daemonset" => Ok(WorkloadKind::DaemonSet),
            "job" => Ok(WorkloadKind::Job),
            "cronjob" => Ok(WorkloadKind::CronJob),
            _ => Err(ParseModelError::WorkloadKind(s.to_string())),
        }
    }
}

/// Identity of a workload: namespace, kind and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PodWorkload {
    pub namespace: String,
    pub kind: WorkloadKind,
    pub name: String,
}

impl PodWorkload {
    pub fn new(namespace: impl Into<String>, kind: WorkloadKind, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for PodWorkload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.kind, self.name)
    }
}

/// Parses `namespace/kind/name`, e.g. `default/Deployment/api`
impl FromStr for PodWorkload {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [namespace, kind, name] if !namespace.is_empty() && !name.is_empty() => {
                Ok(PodWorkload::new(*namespace, kind.parse()?, *name))
            }
            _ => Err(ParseModelError::PodWorkload(s.to_string())),
        }
    }
}

/// Programming language detected for a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgrammingLanguage {
    Java,
    Python,
    Go,
    DotNet,
    JavaScript,
    Php,
    Ruby,
    Rust,
    CPlusPlus,
    MySql,
    Nginx,
    Redis,
    Postgres,
    Unknown,
    /// Deprecated sentinel that used to mark a container as ignored
    Ignored,
}

impl ProgrammingLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgrammingLanguage::Java => "java",
            ProgrammingLanguage::Python => "python",
            ProgrammingLanguage::Go => "go",
            ProgrammingLanguage::DotNet => "dotnet",
            ProgrammingLanguage::JavaScript => "javascript",
            ProgrammingLanguage::Php => "php",
            ProgrammingLanguage::Ruby => "ruby",
            ProgrammingLanguage::Rust => "rust",
            ProgrammingLanguage::CPlusPlus => "cplusplus",
            ProgrammingLanguage::MySql => "mysql",
            ProgrammingLanguage::Nginx => "nginx",
            ProgrammingLanguage::Redis => "redis",
            ProgrammingLanguage::Postgres => "postgres",
            ProgrammingLanguage::Unknown => "unknown",
            ProgrammingLanguage::Ignored => "ignored",
        }
    }
}

impl fmt::Display for ProgrammingLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibCType {
    Glibc,
    Musl,
}

impl LibCType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibCType::Glibc => "glibc",
            LibCType::Musl => "musl",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A non-Odigos instrumentation agent found running in a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherAgent {
    pub name: String,
}

/// Facts detected about one container by runtime inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeDetailsByContainer {
    pub container_name: String,
    pub language: ProgrammingLanguage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,
    /// Environment of the running process, as read from /proc
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_agent: Option<OtherAgent>,
    #[serde(rename = "libCType", default, skip_serializing_if = "Option::is_none")]
    pub libc_type: Option<LibCType>,
    /// Set when reading the image environment from the container runtime failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cri_error_message: Option<String>,
    /// Environment declared by the image, as reported by the container runtime
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_from_container_runtime: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_execution_mode: Option<bool>,
}

impl RuntimeDetailsByContainer {
    pub fn new(container_name: impl Into<String>, language: ProgrammingLanguage) -> Self {
        Self {
            container_name: container_name.into(),
            language,
            runtime_version: None,
            env_vars: Vec::new(),
            other_agent: None,
            libc_type: None,
            cri_error_message: None,
            env_from_container_runtime: Vec::new(),
            secure_execution_mode: None,
        }
    }

    pub fn with_runtime_version(mut self, version: impl Into<String>) -> Self {
        self.runtime_version = Some(version.into());
        self
    }

    pub fn with_libc_type(mut self, libc_type: LibCType) -> Self {
        self.libc_type = Some(libc_type);
        self
    }

    pub fn with_other_agent(mut self, name: impl Into<String>) -> Self {
        self.other_agent = Some(OtherAgent { name: name.into() });
        self
    }

    /// The detected runtime version, treating an empty string as undetected
    pub fn runtime_version(&self) -> Option<&str> {
        self.runtime_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn process_env(&self, name: &str) -> Option<&str> {
        find_env(&self.env_vars, name)
    }

    pub fn container_runtime_env(&self, name: &str) -> Option<&str> {
        find_env(&self.env_from_container_runtime, name)
    }
}

fn find_env<'a>(vars: &'a [EnvVar], name: &str) -> Option<&'a str> {
    vars.iter()
        .find(|var| var.name == name)
        .map(|var| var.value.as_str())
}

/// Telemetry signal kinds a collector can receive and an agent can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Traces,
    Metrics,
    Logs,
}

pub type EnabledSignals = BTreeSet<Signal>;

/// Status of the node collectors group, the receiver for agent telemetry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCollectorsGroup {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub receiver_signals: Vec<Signal>,
}

/// Last reason reported by runtime detection for a workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeDetectionReason {
    DetectedSuccessfully,
    WaitingForDetection,
    NoRunningPods,
    Error,
}

/// Closed set of reasons explaining an agent enablement decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentEnabledReason {
    EnabledSuccessfully,
    WaitingForRuntimeInspection,
    RuntimeDetailsUnavailable,
    WaitingForNodeCollector,
    NoCollectedSignals,
    UnsupportedProgrammingLanguage,
    UnsupportedRuntimeVersion,
    IgnoredContainer,
    NoAvailableAgent,
    MissingDistroParameter,
    InjectionConflict,
    OtherAgentDetected,
    CrashLoopBackOff,
}

impl AgentEnabledReason {
    pub const ALL: [AgentEnabledReason; 13] = [
        AgentEnabledReason::EnabledSuccessfully,
        AgentEnabledReason::WaitingForRuntimeInspection,
        AgentEnabledReason::RuntimeDetailsUnavailable,
        AgentEnabledReason::WaitingForNodeCollector,
        AgentEnabledReason::NoCollectedSignals,
        AgentEnabledReason::UnsupportedProgrammingLanguage,
        AgentEnabledReason::UnsupportedRuntimeVersion,
        AgentEnabledReason::IgnoredContainer,
        AgentEnabledReason::NoAvailableAgent,
        AgentEnabledReason::MissingDistroParameter,
        AgentEnabledReason::InjectionConflict,
        AgentEnabledReason::OtherAgentDetected,
        AgentEnabledReason::CrashLoopBackOff,
    ];

    /// Aggregation priority. When no container is enabled, the reason with
    /// the highest priority is surfaced for the whole workload.
    pub fn priority(&self) -> u8 {
        match self {
            AgentEnabledReason::EnabledSuccessfully => 0,
            AgentEnabledReason::WaitingForRuntimeInspection => 1,
            AgentEnabledReason::RuntimeDetailsUnavailable => 2,
            AgentEnabledReason::WaitingForNodeCollector => 3,
            AgentEnabledReason::NoCollectedSignals => 4,
            AgentEnabledReason::UnsupportedProgrammingLanguage => 5,
            AgentEnabledReason::UnsupportedRuntimeVersion => 6,
            AgentEnabledReason::IgnoredContainer => 7,
            AgentEnabledReason::NoAvailableAgent => 8,
            AgentEnabledReason::MissingDistroParameter => 9,
            AgentEnabledReason::InjectionConflict => 10,
            AgentEnabledReason::OtherAgentDetected => 11,
            AgentEnabledReason::CrashLoopBackOff => 12,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentEnabledReason::EnabledSuccessfully => "EnabledSuccessfully",
            AgentEnabledReason::WaitingForRuntimeInspection => "WaitingForRuntimeInspection",
            AgentEnabledReason::RuntimeDetailsUnavailable => "RuntimeDetailsUnavailable",
            AgentEnabledReason::WaitingForNodeCollector => "WaitingForNodeCollector",
            AgentEnabledReason::NoCollectedSignals => "NoCollectedSignals",
            AgentEnabledReason::UnsupportedProgrammingLanguage => "UnsupportedProgrammingLanguage",
            AgentEnabledReason::UnsupportedRuntimeVersion => "UnsupportedRuntimeVersion",
            AgentEnabledReason::IgnoredContainer => "IgnoredContainer",
            AgentEnabledReason::NoAvailableAgent => "NoAvailableAgent",
            AgentEnabledReason::MissingDistroParameter => "MissingDistroParameter",
            AgentEnabledReason::InjectionConflict => "InjectionConflict",
            AgentEnabledReason::OtherAgentDetected => "OtherAgentDetected",
            AgentEnabledReason::CrashLoopBackOff => "CrashLoopBackOff",
        }
    }
}

impl fmt::Display for AgentEnabledReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters passed to a distro at injection time, e.g. `libcType: musl`
pub type DistroParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeConditionOperator {
    Equals,
    StartWith,
}

/// One attribute predicate of a head sampling rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCondition {
    pub key: String,
    pub val: String,
    pub operator: AttributeConditionOperator,
}

impl AttributeCondition {
    pub fn equals(key: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
            operator: AttributeConditionOperator::Equals,
        }
    }

    pub fn starts_with(key: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
            operator: AttributeConditionOperator::StartWith,
        }
    }
}

/// All conditions must match (AND) for the fraction to apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesAndSamplerRule {
    pub attribute_conditions: Vec<AttributeCondition>,
    pub fraction: f64,
}

/// Compiled head sampling for one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadSamplingConfig {
    pub attributes_and_sampler_rules: Vec<AttributesAndSamplerRule>,
    pub fallback_fraction: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTracesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_sampling: Option<HeadSamplingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetricsConfig {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLogsConfig {}

/// Enablement decision for a single container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAgentConfig {
    pub container_name: String,
    pub agent_enabled: bool,
    pub agent_enabled_reason: AgentEnabledReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_enabled_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otel_distro_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distro_params: Option<DistroParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces: Option<AgentTracesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AgentMetricsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<AgentLogsConfig>,
}

impl ContainerAgentConfig {
    pub fn disabled(container_name: impl Into<String>, reason: AgentEnabledReason) -> Self {
        Self {
            container_name: container_name.into(),
            agent_enabled: false,
            agent_enabled_reason: reason,
            agent_enabled_message: None,
            otel_distro_name: None,
            distro_params: None,
            traces: None,
            metrics: None,
            logs: None,
        }
    }

    pub fn enabled(
        container_name: impl Into<String>,
        distro_name: impl Into<String>,
        distro_params: Option<DistroParams>,
        signals: &EnabledSignals,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            agent_enabled: true,
            agent_enabled_reason: AgentEnabledReason::EnabledSuccessfully,
            agent_enabled_message: None,
            otel_distro_name: Some(distro_name.into()),
            distro_params,
            traces: signals
                .contains(&Signal::Traces)
                .then(AgentTracesConfig::default),
            metrics: signals
                .contains(&Signal::Metrics)
                .then(AgentMetricsConfig::default),
            logs: signals.contains(&Signal::Logs).then(AgentLogsConfig::default),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.agent_enabled_message = Some(message.into());
        self
    }

    pub fn with_distro(mut self, distro_name: impl Into<String>, params: Option<DistroParams>) -> Self {
        self.otel_distro_name = Some(distro_name.into());
        self.distro_params = params;
        self
    }

    pub fn distro_name(&self) -> Option<&str> {
        self.otel_distro_name.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        })
    }
}

/// Workload-level status condition written for user-facing tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEnabledCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: ConditionStatus,
    pub reason: AgentEnabledReason,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_table_is_a_total_order() {
        let mut priorities: Vec<u8> = AgentEnabledReason::ALL
            .iter()
            .map(|r| r.priority())
            .collect();
        priorities.sort_unstable();
        priorities.dedup();
        assert_eq!(priorities.len(), AgentEnabledReason::ALL.len());
    }

    #[test]
    fn test_actionable_reasons_outrank_waiting_reasons() {
        assert!(
            AgentEnabledReason::OtherAgentDetected.priority()
                > AgentEnabledReason::UnsupportedProgrammingLanguage.priority()
        );
        assert!(
            AgentEnabledReason::UnsupportedProgrammingLanguage.priority()
                > AgentEnabledReason::WaitingForRuntimeInspection.priority()
        );
        assert_eq!(AgentEnabledReason::EnabledSuccessfully.priority(), 0);
    }

    #[test]
    fn test_pod_workload_parse_and_display() {
        let pw: PodWorkload = "shop/deployment/cart".parse().unwrap();
        assert_eq!(pw, PodWorkload::new("shop", WorkloadKind::Deployment, "cart"));
        assert_eq!(pw.to_string(), "shop/Deployment/cart");

        assert!("shop/cart".parse::<PodWorkload>().is_err());
        assert!("shop/Pod/cart".parse::<PodWorkload>().is_err());
    }

    #[test]
    fn test_runtime_details_serde_names() {
        let json = r#"{
            "containerName": "api",
            "language": "python",
            "runtimeVersion": "3.11.4",
            "libCType": "musl",
            "otherAgent": {"name": "New Relic Agent"}
        }"#;
        let details: RuntimeDetailsByContainer = serde_json::from_str(json).unwrap();
        assert_eq!(details.language, ProgrammingLanguage::Python);
        assert_eq!(details.libc_type, Some(LibCType::Musl));
        assert_eq!(details.runtime_version(), Some("3.11.4"));
        assert!(details.other_agent.is_some());
    }

    #[test]
    fn test_empty_runtime_version_is_undetected() {
        let details =
            RuntimeDetailsByContainer::new("api", ProgrammingLanguage::Go).with_runtime_version("  ");
        assert_eq!(details.runtime_version(), None);
    }

    #[test]
    fn test_enabled_config_carries_signal_configs() {
        let signals: EnabledSignals = [Signal::Traces, Signal::Logs].into_iter().collect();
        let config = ContainerAgentConfig::enabled("api", "python-community", None, &signals);
        assert!(config.traces.is_some());
        assert!(config.metrics.is_none());
        assert!(config.logs.is_some());
        assert_eq!(config.distro_name(), Some("python-community"));
    }
}
