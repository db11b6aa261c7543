//! Agent enablement decision engine
//!
//! [`evaluate_workload`] is a pure function from one workload's inputs to its
//! desired agent configuration. It performs no I/O and holds no state, so the
//! host may call it from any task and re-run it whenever an input changes.

mod decision;
mod hash;
mod params;
mod prerequisites;
mod resolver;
mod status;
mod version;

pub use decision::{
    decide, env_injection_decision, DecisionContext, AGENT_LOADER_PATH,
    DEFAULT_ENV_INJECTION_METHOD,
};
pub use hash::{agents_meta_hash, hash_changed};
pub use params::{resolve_distro_params, DistroParamError};
pub use prerequisites::{check_prerequisites, GateInputs, Waiting};
pub use resolver::resolve_distro_per_language;
pub use status::{aggregate_status, waiting_condition, AGENT_ENABLED_CONDITION_TYPE};
pub use version::{check_supported, major_minor, parse_runtime_version, RuntimeVersionError};

use crate::config::EffectiveConfig;
use crate::distro::DistroCatalog;
use crate::models::{
    AgentEnabledCondition, ContainerAgentConfig, EnabledSignals, NodeCollectorsGroup, PodWorkload,
    RuntimeDetailsByContainer, RuntimeDetectionReason, Signal,
};
use crate::rules::{InstrumentationRule, Sampling};
use crate::sampling::{compile_container_sampling, ContainerSampling};
use k8s_openapi::api::core::v1::PodSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A container of the workload and its optional user-provided runtime info
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverride {
    pub container_name: String,
    /// Wins over automatic runtime detection when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_info: Option<RuntimeDetailsByContainer>,
}

/// Observed state of one workload, as read from the cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadState {
    pub workload: PodWorkload,
    /// Every container of the pod template. When empty, the containers seen
    /// by runtime detection are used.
    #[serde(default)]
    pub containers: Vec<ContainerOverride>,
    #[serde(default)]
    pub runtime_details: Vec<RuntimeDetailsByContainer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_detection_reason: Option<RuntimeDetectionReason>,
    #[serde(default)]
    pub rollback_occurred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_spec: Option<PodSpec>,
    /// Hash persisted by the previous evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents_meta_hash: Option<String>,
}

impl WorkloadState {
    pub fn new(workload: PodWorkload) -> Self {
        Self {
            workload,
            containers: Vec::new(),
            runtime_details: Vec::new(),
            runtime_detection_reason: None,
            rollback_occurred: false,
            pod_spec: None,
            agents_meta_hash: None,
        }
    }

    pub fn with_runtime_details(mut self, details: RuntimeDetailsByContainer) -> Self {
        self.runtime_details.push(details);
        self
    }

    pub fn with_container(mut self, container_name: impl Into<String>) -> Self {
        self.containers.push(ContainerOverride {
            container_name: container_name.into(),
            runtime_info: None,
        });
        self
    }

    fn has_runtime_overrides(&self) -> bool {
        self.containers.iter().any(|c| c.runtime_info.is_some())
    }

    fn container_names(&self) -> Vec<&str> {
        if self.containers.is_empty() {
            self.runtime_details
                .iter()
                .map(|d| d.container_name.as_str())
                .collect()
        } else {
            self.containers
                .iter()
                .map(|c| c.container_name.as_str())
                .collect()
        }
    }

    /// Runtime details for a container: the override if any, else detection
    pub fn details_for(&self, container_name: &str) -> Option<&RuntimeDetailsByContainer> {
        self.containers
            .iter()
            .find(|c| c.container_name == container_name)
            .and_then(|c| c.runtime_info.as_ref())
            .or_else(|| {
                self.runtime_details
                    .iter()
                    .find(|d| d.container_name == container_name)
            })
    }
}

/// Cluster-wide inputs shared by every workload evaluation
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub config: &'a EffectiveConfig,
    pub catalog: &'a DistroCatalog,
    pub node_collectors_group: Option<&'a NodeCollectorsGroup>,
    pub instrumentation_rules: &'a [InstrumentationRule],
    pub sampling_rules: &'a [Sampling],
}

/// Desired agent configuration for one workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadEvaluation {
    pub workload: PodWorkload,
    pub agent_injection_enabled: bool,
    pub containers: Vec<ContainerAgentConfig>,
    /// Present only when at least one container is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents_meta_hash: Option<String>,
    pub condition: AgentEnabledCondition,
    /// Compiled sampling per enabled container
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sampling: BTreeMap<String, ContainerSampling>,
}

impl WorkloadEvaluation {
    pub fn enabled_containers(&self) -> impl Iterator<Item = &ContainerAgentConfig> {
        self.containers.iter().filter(|c| c.agent_enabled)
    }
}

/// Whether the orchestration layer should roll the workload out again
pub fn rollout_required(previous_hash: Option<&str>, evaluation: &WorkloadEvaluation) -> bool {
    hash_changed(previous_hash, evaluation.agents_meta_hash.as_deref())
}

/// Signals collected by the node collector, minus traces when a
/// workload-level rule disables them
fn enabled_signals(group: &NodeCollectorsGroup, rules: &[&InstrumentationRule]) -> EnabledSignals {
    let mut signals: EnabledSignals = group.receiver_signals.iter().copied().collect();
    let traces_disabled = rules
        .iter()
        .any(|rule| rule.is_workload_level() && rule.disables_traces());
    if traces_disabled {
        signals.remove(&Signal::Traces);
    }
    signals
}

pub fn evaluate_workload(state: &WorkloadState, ctx: &EvaluationContext<'_>) -> WorkloadEvaluation {
    let gate = GateInputs {
        node_collectors_group: ctx.node_collectors_group,
        has_runtime_overrides: state.has_runtime_overrides(),
        has_detected_runtime_details: !state.runtime_details.is_empty(),
        runtime_detection_reason: state.runtime_detection_reason,
    };
    let group = match check_prerequisites(gate) {
        Ok(group) => group,
        Err(waiting) => return waiting_evaluation(state, &waiting),
    };

    let applicable: Vec<&InstrumentationRule> = ctx
        .instrumentation_rules
        .iter()
        .filter(|rule| rule.applies_to(&state.workload))
        .collect();

    let distro_per_language = resolve_distro_per_language(ctx.catalog, &applicable);
    let signals = enabled_signals(group, &applicable);

    let decision_ctx = DecisionContext {
        config: ctx.config,
        distro_per_language: &distro_per_language,
        catalog: ctx.catalog,
        signals: &signals,
        rollback_occurred: state.rollback_occurred,
    };

    let mut containers: Vec<ContainerAgentConfig> = state
        .container_names()
        .into_iter()
        .map(|name| decide(name, state.details_for(name), &decision_ctx))
        .collect();

    let mut sampling = BTreeMap::new();
    for container in containers.iter_mut().filter(|c| c.agent_enabled) {
        let Some(distro) = container.distro_name().and_then(|name| ctx.catalog.get(name)) else {
            continue;
        };
        let Some(traces) = container.traces.as_mut() else {
            continue;
        };
        let compiled = compile_container_sampling(
            distro,
            ctx.config,
            ctx.sampling_rules,
            &state.workload,
            &container.container_name,
            state.pod_spec.as_ref(),
        );
        traces.head_sampling = compiled.head_sampling.clone();
        sampling.insert(container.container_name.clone(), compiled);
    }

    let (agent_injection_enabled, condition) = aggregate_status(&containers);
    let agents_meta_hash = agent_injection_enabled.then(|| agents_meta_hash(&containers));

    WorkloadEvaluation {
        workload: state.workload.clone(),
        agent_injection_enabled,
        containers,
        agents_meta_hash,
        condition,
        sampling,
    }
}

/// Prerequisites not met: injection off and every container cleared
fn waiting_evaluation(state: &WorkloadState, waiting: &Waiting) -> WorkloadEvaluation {
    WorkloadEvaluation {
        workload: state.workload.clone(),
        agent_injection_enabled: false,
        containers: Vec::new(),
        agents_meta_hash: None,
        condition: waiting_condition(waiting.reason, &waiting.message),
        sampling: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{K8sHealthProbesSampling, SamplingConfig};
    use crate::distro::{HeadSamplingSupport, OtelDistro, LIBC_TYPE_PARAMETER};
    use crate::models::{
        AgentEnabledReason, ConditionStatus, LibCType, ProgrammingLanguage, WorkloadKind,
    };
    use crate::rules::{NoisyOperation, OtelDistros, TraceConfig};
    use k8s_openapi::api::core::v1::{Container, HTTPGetAction, Probe};

    fn catalog() -> DistroCatalog {
        DistroCatalog::default()
            .with_distro(
                OtelDistro::new("python-community", ProgrammingLanguage::Python)
                    .with_required_parameter(LIBC_TYPE_PARAMETER)
                    .with_runtime_environment("CPython", None)
                    .with_head_sampling(HeadSamplingSupport {
                        supported: true,
                        ..Default::default()
                    }),
            )
            .with_distro(OtelDistro::new("python-enterprise", ProgrammingLanguage::Python))
            .with_default(ProgrammingLanguage::Python, "python-community")
    }

    fn group() -> NodeCollectorsGroup {
        NodeCollectorsGroup {
            ready: true,
            receiver_signals: vec![Signal::Traces, Signal::Metrics],
        }
    }

    fn api_state() -> WorkloadState {
        WorkloadState::new(PodWorkload::new("shop", WorkloadKind::Deployment, "cart"))
            .with_container("api")
            .with_runtime_details(
                RuntimeDetailsByContainer::new("api", ProgrammingLanguage::Python)
                    .with_runtime_version("3.11.4")
                    .with_libc_type(LibCType::Musl),
            )
    }

    struct Inputs {
        config: EffectiveConfig,
        catalog: DistroCatalog,
        group: Option<NodeCollectorsGroup>,
        rules: Vec<InstrumentationRule>,
        sampling: Vec<Sampling>,
    }

    impl Inputs {
        fn new() -> Self {
            Self {
                config: EffectiveConfig::default(),
                catalog: catalog(),
                group: Some(group()),
                rules: Vec::new(),
                sampling: Vec::new(),
            }
        }

        fn evaluate(&self, state: &WorkloadState) -> WorkloadEvaluation {
            let ctx = EvaluationContext {
                config: &self.config,
                catalog: &self.catalog,
                node_collectors_group: self.group.as_ref(),
                instrumentation_rules: &self.rules,
                sampling_rules: &self.sampling,
            };
            evaluate_workload(state, &ctx)
        }
    }

    #[test]
    fn test_end_to_end_python_container() {
        let evaluation = Inputs::new().evaluate(&api_state());

        assert!(evaluation.agent_injection_enabled);
        assert_eq!(evaluation.condition.status, ConditionStatus::True);
        let api = &evaluation.containers[0];
        assert!(api.agent_enabled);
        assert_eq!(api.distro_name(), Some("python-community"));
        let params = api.distro_params.as_ref().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["libcType"], "musl");

        let hash = evaluation.agents_meta_hash.as_deref().unwrap();
        assert_eq!(hash.len(), 16);
        assert!(rollout_required(None, &evaluation));
        assert!(!rollout_required(Some(hash), &evaluation));
    }

    #[test]
    fn test_waiting_for_collector_clears_everything() {
        let mut inputs = Inputs::new();
        inputs.group = None;
        let evaluation = inputs.evaluate(&api_state());

        assert!(!evaluation.agent_injection_enabled);
        assert!(evaluation.containers.is_empty());
        assert!(evaluation.agents_meta_hash.is_none());
        assert_eq!(evaluation.condition.status, ConditionStatus::Unknown);
        assert_eq!(
            evaluation.condition.reason,
            AgentEnabledReason::WaitingForNodeCollector
        );
    }

    #[test]
    fn test_waiting_for_runtime_inspection() {
        let state = WorkloadState::new(PodWorkload::new("shop", WorkloadKind::Deployment, "cart"))
            .with_container("api");
        let evaluation = Inputs::new().evaluate(&state);
        assert_eq!(
            evaluation.condition.reason,
            AgentEnabledReason::WaitingForRuntimeInspection
        );
    }

    #[test]
    fn test_runtime_override_wins() {
        let mut state = api_state();
        state.containers[0].runtime_info = Some(RuntimeDetailsByContainer::new(
            "api",
            ProgrammingLanguage::Unknown,
        ));
        let evaluation = Inputs::new().evaluate(&state);
        assert!(!evaluation.agent_injection_enabled);
        assert_eq!(
            evaluation.condition.reason,
            AgentEnabledReason::UnsupportedProgrammingLanguage
        );
        assert!(evaluation.agents_meta_hash.is_none());
    }

    #[test]
    fn test_container_without_details() {
        let state = api_state().with_container("sidecar");
        let evaluation = Inputs::new().evaluate(&state);
        assert!(evaluation.agent_injection_enabled);
        assert_eq!(
            evaluation.containers[1].agent_enabled_reason,
            AgentEnabledReason::RuntimeDetailsUnavailable
        );
    }

    #[test]
    fn test_distro_override_rule() {
        let mut inputs = Inputs::new();
        let mut rule = InstrumentationRule::new("use-enterprise");
        rule.otel_distros = Some(OtelDistros {
            otel_distro_names: vec!["python-enterprise".to_string()],
        });
        inputs.rules.push(rule);

        let evaluation = inputs.evaluate(&api_state());
        assert_eq!(
            evaluation.containers[0].distro_name(),
            Some("python-enterprise")
        );
        assert!(evaluation.containers[0].distro_params.is_none());
    }

    #[test]
    fn test_rule_for_other_workload_is_ignored() {
        let mut inputs = Inputs::new();
        let mut rule = InstrumentationRule::new("use-enterprise");
        rule.workloads = Some(vec![PodWorkload::new(
            "shop",
            WorkloadKind::Deployment,
            "checkout",
        )]);
        rule.otel_distros = Some(OtelDistros {
            otel_distro_names: vec!["python-enterprise".to_string()],
        });
        inputs.rules.push(rule);

        let evaluation = inputs.evaluate(&api_state());
        assert_eq!(
            evaluation.containers[0].distro_name(),
            Some("python-community")
        );
    }

    #[test]
    fn test_trace_disable_rule_removes_traces() {
        let mut inputs = Inputs::new();
        let mut rule = InstrumentationRule::new("no-traces");
        rule.trace_config = Some(TraceConfig {
            disabled: Some(true),
        });
        inputs.rules.push(rule);

        let evaluation = inputs.evaluate(&api_state());
        let api = &evaluation.containers[0];
        assert!(api.agent_enabled);
        assert!(api.traces.is_none());
        assert!(api.metrics.is_some());
        assert!(evaluation.sampling.is_empty());

        inputs.group = Some(NodeCollectorsGroup {
            ready: true,
            receiver_signals: vec![Signal::Traces],
        });
        let evaluation = inputs.evaluate(&api_state());
        assert_eq!(
            evaluation.condition.reason,
            AgentEnabledReason::NoCollectedSignals
        );
    }

    #[test]
    fn test_crash_loop_disables_injection() {
        let mut state = api_state();
        state.rollback_occurred = true;
        let evaluation = Inputs::new().evaluate(&state);
        assert!(!evaluation.agent_injection_enabled);
        assert_eq!(
            evaluation.condition.reason,
            AgentEnabledReason::CrashLoopBackOff
        );
        assert!(evaluation.agents_meta_hash.is_none());
    }

    #[test]
    fn test_head_sampling_attached_to_traces() {
        let mut inputs = Inputs::new();
        inputs.config.sampling = Some(SamplingConfig {
            k8s_health_probes_sampling: Some(K8sHealthProbesSampling {
                enabled: Some(true),
                keep_percentage: Some(10.0),
            }),
        });
        inputs.sampling.push(Sampling {
            name: "throttle".to_string(),
            noisy_operations: vec![NoisyOperation {
                percentage_at_most: Some(50.0),
                ..Default::default()
            }],
            ..Default::default()
        });

        let mut state = api_state();
        state.pod_spec = Some(PodSpec {
            containers: vec![Container {
                name: "api".to_string(),
                liveness_probe: Some(Probe {
                    http_get: Some(HTTPGetAction {
                        path: Some("/healthz".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        });

        let evaluation = inputs.evaluate(&state);
        let head = evaluation.containers[0]
            .traces
            .as_ref()
            .and_then(|t| t.head_sampling.as_ref())
            .unwrap();
        assert_eq!(head.attributes_and_sampler_rules.len(), 1);
        assert!((head.fallback_fraction - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            evaluation.sampling["api"].head_sampling.as_ref(),
            Some(head)
        );
    }

    #[test]
    fn test_hash_ignores_distro_params_across_evaluations() {
        let inputs = Inputs::new();
        let first = inputs.evaluate(&api_state());

        let mut glibc = api_state();
        glibc.runtime_details[0].libc_type = Some(LibCType::Glibc);
        let second = inputs.evaluate(&glibc);

        assert_ne!(first.containers, second.containers);
        assert_eq!(first.agents_meta_hash, second.agents_meta_hash);
        assert!(!rollout_required(first.agents_meta_hash.as_deref(), &second));
    }

    #[test]
    fn test_state_deserializes_with_pod_spec() {
        let json = r#"{
            "workload": {"namespace": "shop", "kind": "Deployment", "name": "cart"},
            "containers": [{"containerName": "api"}],
            "runtimeDetails": [{"containerName": "api", "language": "python", "libCType": "glibc"}],
            "podSpec": {"containers": [{"name": "api", "image": "cart:1.0"}]}
        }"#;
        let state: WorkloadState = serde_json::from_str(json).unwrap();
        assert_eq!(state.container_names(), vec!["api"]);
        assert!(state.pod_spec.is_some());
        assert!(state.details_for("api").is_some());
    }
}
