//! Per-container enablement decision
//!
//! Checks run in a fixed order and the first failing one decides. The
//! function never fails: every outcome is a [`ContainerAgentConfig`] with a
//! reason and, when disabled, a message explaining it.

use super::params::resolve_distro_params;
use super::version;
use crate::config::{EffectiveConfig, EnvInjectionDecision, EnvInjectionMethod};
use crate::distro::{DistroCatalog, DistroPerLanguage, OtelDistro};
use crate::models::{
    AgentEnabledReason, ContainerAgentConfig, EnabledSignals, ProgrammingLanguage,
    RuntimeDetailsByContainer,
};

/// Path of the agent loader library as mounted into instrumented pods
pub const AGENT_LOADER_PATH: &str = "/var/odigos/loader/loader.so";

/// Injection method used when the effective config does not set one
pub const DEFAULT_ENV_INJECTION_METHOD: EnvInjectionMethod =
    EnvInjectionMethod::LoaderFallbackToPodManifest;

const CRASH_LOOP_MESSAGE: &str = "Pods entered CrashLoopBackOff; instrumentation disabled";

/// Workload-wide inputs shared by every container decision
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub config: &'a EffectiveConfig,
    pub distro_per_language: &'a DistroPerLanguage,
    pub catalog: &'a DistroCatalog,
    pub signals: &'a EnabledSignals,
    pub rollback_occurred: bool,
}

/// How the agent environment reaches this container's process
pub fn env_injection_decision(
    config: &EffectiveConfig,
    distro: &OtelDistro,
    details: &RuntimeDetailsByContainer,
) -> EnvInjectionDecision {
    match config
        .agent_env_vars_injection_method
        .unwrap_or(DEFAULT_ENV_INJECTION_METHOD)
    {
        EnvInjectionMethod::PodManifest => EnvInjectionDecision::PodManifest,
        EnvInjectionMethod::Loader => EnvInjectionDecision::Loader,
        EnvInjectionMethod::LoaderFallbackToPodManifest => {
            if distro.ld_preload_supported() && details.secure_execution_mode == Some(false) {
                EnvInjectionDecision::Loader
            } else {
                EnvInjectionDecision::PodManifest
            }
        }
    }
}

/// Returns a message when loader-only injection cannot work for this container
fn loader_conflict(
    config: &EffectiveConfig,
    distro: &OtelDistro,
    details: &RuntimeDetailsByContainer,
) -> Option<String> {
    let loader_only = config.agent_env_vars_injection_method == Some(EnvInjectionMethod::Loader);
    if !(loader_only && distro.has_append_env_vars() && distro.ld_preload_supported()) {
        return None;
    }

    // unknown mode is treated as secure
    if details.secure_execution_mode.unwrap_or(true) {
        return Some(
            "container is running in secure execution mode and injection method is set to 'loader'"
                .to_string(),
        );
    }

    match details.process_env("LD_PRELOAD") {
        Some(value) if !value.contains(AGENT_LOADER_PATH) => Some(format!(
            "container is already using LD_PRELOAD env var, and injection method is set to 'loader'. current value: {}",
            value
        )),
        _ => None,
    }
}

/// Decides whether the agent is injected into one container.
///
/// `details` is `None` when runtime inspection has not reported on the
/// container. The checks run in order: ignored name, detected language,
/// distro availability, collected signals, loader conflict, runtime version,
/// distro parameters, crash-loop rollback and other agents. A container that
/// passes them all is enabled with the resolved distro and parameters.
pub fn decide(
    container_name: &str,
    details: Option<&RuntimeDetailsByContainer>,
    ctx: &DecisionContext<'_>,
) -> ContainerAgentConfig {
    let ignored_by_name = ctx.config.is_container_ignored(container_name);

    let Some(details) = details else {
        return if ignored_by_name {
            ContainerAgentConfig::disabled(container_name, AgentEnabledReason::IgnoredContainer)
                .with_message(format!(
                    "container '{}' is in the ignored containers list",
                    container_name
                ))
        } else {
            ContainerAgentConfig::disabled(
                container_name,
                AgentEnabledReason::RuntimeDetailsUnavailable,
            )
            .with_message(format!(
                "no runtime details available for container '{}'",
                container_name
            ))
        };
    };

    if details.language == ProgrammingLanguage::Unknown {
        return ContainerAgentConfig::disabled(
            container_name,
            AgentEnabledReason::UnsupportedProgrammingLanguage,
        )
        .with_message("runtime inspection could not detect a supported programming language");
    }

    if ignored_by_name {
        return ContainerAgentConfig::disabled(container_name, AgentEnabledReason::IgnoredContainer)
            .with_message(format!(
                "container '{}' is in the ignored containers list",
                container_name
            ));
    }

    if details.language == ProgrammingLanguage::Ignored {
        return ContainerAgentConfig::disabled(container_name, AgentEnabledReason::IgnoredContainer)
            .with_message(format!("container '{}' is marked as ignored", container_name));
    }

    let Some(distro_name) = ctx.distro_per_language.get(&details.language) else {
        return ContainerAgentConfig::disabled(container_name, AgentEnabledReason::NoAvailableAgent)
            .with_message(format!(
                "no OpenTelemetry distribution available for language '{}'",
                details.language
            ));
    };

    let Some(distro) = ctx.catalog.get(distro_name) else {
        return ContainerAgentConfig::disabled(container_name, AgentEnabledReason::NoAvailableAgent)
            .with_message(format!(
                "OpenTelemetry distribution '{}' was not found in the catalog",
                distro_name
            ));
    };

    if ctx.signals.is_empty() {
        return ContainerAgentConfig::disabled(
            container_name,
            AgentEnabledReason::NoCollectedSignals,
        )
        .with_message("all signals are disabled, no agent will be injected");
    }

    if let Some(message) = loader_conflict(ctx.config, distro, details) {
        return ContainerAgentConfig::disabled(
            container_name,
            AgentEnabledReason::InjectionConflict,
        )
        .with_message(message);
    }

    match (details.runtime_version(), distro.single_runtime_constraint()) {
        (Some(detected), Some((environment, constraint))) => {
            if let Err(err) = version::check_supported(environment, constraint, detected) {
                return ContainerAgentConfig::disabled(
                    container_name,
                    AgentEnabledReason::UnsupportedRuntimeVersion,
                )
                .with_message(err.to_string());
            }
        }
        (None, _) if distro.uses_runtime_version_placeholder() => {
            return ContainerAgentConfig::disabled(
                container_name,
                AgentEnabledReason::UnsupportedRuntimeVersion,
            )
            .with_message(format!(
                "OpenTelemetry distribution '{}' requires a runtime version to configure the agent, but none was detected",
                distro.name
            ));
        }
        _ => {}
    }

    let injection = env_injection_decision(ctx.config, distro, details);
    let params = match resolve_distro_params(distro, details, injection) {
        Ok(params) => params,
        Err(err) => {
            return ContainerAgentConfig::disabled(
                container_name,
                AgentEnabledReason::MissingDistroParameter,
            )
            .with_message(err.to_string());
        }
    };

    if ctx.rollback_occurred {
        return ContainerAgentConfig::disabled(
            container_name,
            AgentEnabledReason::CrashLoopBackOff,
        )
        .with_message(CRASH_LOOP_MESSAGE)
        .with_distro(distro.name.clone(), params);
    }

    if let Some(other) = &details.other_agent {
        if !ctx.config.concurrent_agents_allowed() {
            return ContainerAgentConfig::disabled(
                container_name,
                AgentEnabledReason::OtherAgentDetected,
            )
            .with_message(format!(
                "odigos agent not enabled due to other instrumentation agent '{}' detected running in the container",
                other.name
            ));
        }
        return ContainerAgentConfig::enabled(
            container_name,
            distro.name.clone(),
            params,
            ctx.signals,
        )
        .with_message(format!(
            "we are operating alongside the {}, which is not the recommended configuration. We suggest disabling the {} for optimal performance.",
            other.name, other.name
        ));
    }

    ContainerAgentConfig::enabled(container_name, distro.name.clone(), params, ctx.signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distro::{LIBC_TYPE_PARAMETER, RUNTIME_VERSION_MAJOR_MINOR_PARAMETER};
    use crate::models::{EnvVar, LibCType, Signal};

    struct Fixture {
        config: EffectiveConfig,
        catalog: DistroCatalog,
        per_language: DistroPerLanguage,
        signals: EnabledSignals,
        rollback_occurred: bool,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = DistroCatalog::default()
                .with_distro(
                    OtelDistro::new("python-community", ProgrammingLanguage::Python)
                        .with_required_parameter(LIBC_TYPE_PARAMETER)
                        .with_runtime_environment("CPython", None)
                        .with_append_env("PYTHONPATH")
                        .with_ld_preload_support(),
                )
                .with_distro(
                    OtelDistro::new("nodejs-community", ProgrammingLanguage::JavaScript)
                        .with_runtime_environment("nodejs", Some(">=2.0")),
                )
                .with_distro(
                    OtelDistro::new("php-community", ProgrammingLanguage::Php)
                        .with_required_parameter(RUNTIME_VERSION_MAJOR_MINOR_PARAMETER)
                        .with_static_env(
                            "PHP_INI_SCAN_DIR",
                            "/php/{{RUNTIME_VERSION_MAJOR_MINOR}}",
                        ),
                )
                .with_default(ProgrammingLanguage::Python, "python-community")
                .with_default(ProgrammingLanguage::JavaScript, "nodejs-community")
                .with_default(ProgrammingLanguage::Php, "php-community");
            let per_language = catalog.default_distro_names().clone();
            Self {
                config: EffectiveConfig::default(),
                catalog,
                per_language,
                signals: [Signal::Traces, Signal::Metrics].into_iter().collect(),
                rollback_occurred: false,
            }
        }

        fn decide(
            &self,
            name: &str,
            details: Option<&RuntimeDetailsByContainer>,
        ) -> ContainerAgentConfig {
            let ctx = DecisionContext {
                config: &self.config,
                distro_per_language: &self.per_language,
                catalog: &self.catalog,
                signals: &self.signals,
                rollback_occurred: self.rollback_occurred,
            };
            decide(name, details, &ctx)
        }
    }

    fn python_api() -> RuntimeDetailsByContainer {
        RuntimeDetailsByContainer::new("api", ProgrammingLanguage::Python)
            .with_runtime_version("3.11.4")
            .with_libc_type(LibCType::Musl)
    }

    #[test]
    fn test_python_container_enabled_with_libc_param() {
        let result = Fixture::new().decide("api", Some(&python_api()));
        assert!(result.agent_enabled);
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::EnabledSuccessfully);
        assert_eq!(result.distro_name(), Some("python-community"));
        let params = result.distro_params.unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["libcType"], "musl");
        assert!(result.traces.is_some());
        assert!(result.logs.is_none());
    }

    #[test]
    fn test_unknown_language_wins_over_everything() {
        let mut fixture = Fixture::new();
        fixture.config.ignored_containers = vec!["api".to_string()];
        fixture.rollback_occurred = true;
        let details = RuntimeDetailsByContainer::new("api", ProgrammingLanguage::Unknown);
        let result = fixture.decide("api", Some(&details));
        assert!(!result.agent_enabled);
        assert_eq!(
            result.agent_enabled_reason,
            AgentEnabledReason::UnsupportedProgrammingLanguage
        );
    }

    #[test]
    fn test_ignored_container_and_language() {
        let mut fixture = Fixture::new();
        fixture.config.ignored_containers = vec!["istio-proxy".to_string()];
        let sidecar = RuntimeDetailsByContainer::new("istio-proxy", ProgrammingLanguage::Go);
        let result = fixture.decide("istio-proxy", Some(&sidecar));
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::IgnoredContainer);

        let ignored = RuntimeDetailsByContainer::new("api", ProgrammingLanguage::Ignored);
        let result = fixture.decide("api", Some(&ignored));
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::IgnoredContainer);
    }

    #[test]
    fn test_missing_details() {
        let mut fixture = Fixture::new();
        let result = fixture.decide("api", None);
        assert_eq!(
            result.agent_enabled_reason,
            AgentEnabledReason::RuntimeDetailsUnavailable
        );

        fixture.config.ignored_containers = vec!["api".to_string()];
        let result = fixture.decide("api", None);
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::IgnoredContainer);
    }

    #[test]
    fn test_no_available_agent() {
        let fixture = Fixture::new();
        let details = RuntimeDetailsByContainer::new("api", ProgrammingLanguage::Ruby);
        let result = fixture.decide("api", Some(&details));
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::NoAvailableAgent);

        let mut fixture = Fixture::new();
        fixture
            .per_language
            .insert(ProgrammingLanguage::Ruby, "ruby-missing".to_string());
        let result = fixture.decide("api", Some(&details));
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::NoAvailableAgent);
    }

    #[test]
    fn test_no_signals() {
        let mut fixture = Fixture::new();
        fixture.signals.clear();
        let result = fixture.decide("api", Some(&python_api()));
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::NoCollectedSignals);
    }

    #[test]
    fn test_runtime_version_out_of_range() {
        let fixture = Fixture::new();
        let details = RuntimeDetailsByContainer::new("web", ProgrammingLanguage::JavaScript)
            .with_runtime_version("1.2.3");
        let result = fixture.decide("web", Some(&details));
        assert_eq!(
            result.agent_enabled_reason,
            AgentEnabledReason::UnsupportedRuntimeVersion
        );
        let message = result.agent_enabled_message.unwrap();
        assert!(message.contains(">=2.0"));
        assert!(message.contains("1.2.3"));
    }

    #[test]
    fn test_malformed_version_only_affects_container() {
        let fixture = Fixture::new();
        let details = RuntimeDetailsByContainer::new("web", ProgrammingLanguage::JavaScript)
            .with_runtime_version("latest");
        let result = fixture.decide("web", Some(&details));
        assert_eq!(
            result.agent_enabled_reason,
            AgentEnabledReason::UnsupportedRuntimeVersion
        );
        assert_eq!(
            result.agent_enabled_message.as_deref(),
            Some("failed to parse runtime version: latest")
        );
    }

    #[test]
    fn test_placeholder_without_version() {
        let fixture = Fixture::new();
        let details = RuntimeDetailsByContainer::new("web", ProgrammingLanguage::Php);
        let result = fixture.decide("web", Some(&details));
        assert_eq!(
            result.agent_enabled_reason,
            AgentEnabledReason::UnsupportedRuntimeVersion
        );

        let detected = details.with_runtime_version("8.2.1");
        let result = fixture.decide("web", Some(&detected));
        assert!(result.agent_enabled);
        assert_eq!(result.distro_params.unwrap()["runtimeVersionMajorMinor"], "8.2");
    }

    #[test]
    fn test_missing_libc() {
        let fixture = Fixture::new();
        let details = RuntimeDetailsByContainer::new("api", ProgrammingLanguage::Python);
        let result = fixture.decide("api", Some(&details));
        assert_eq!(
            result.agent_enabled_reason,
            AgentEnabledReason::MissingDistroParameter
        );
    }

    #[test]
    fn test_other_agent() {
        let mut fixture = Fixture::new();
        let details = python_api().with_other_agent("New Relic Agent");

        let result = fixture.decide("api", Some(&details));
        assert!(!result.agent_enabled);
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::OtherAgentDetected);

        fixture.config.allow_concurrent_agents = Some(true);
        let result = fixture.decide("api", Some(&details));
        assert!(result.agent_enabled);
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::EnabledSuccessfully);
        assert!(result
            .agent_enabled_message
            .as_deref()
            .unwrap()
            .contains("New Relic Agent"));
        assert_eq!(result.distro_name(), Some("python-community"));
    }

    #[test]
    fn test_crash_loop_keeps_distro() {
        let mut fixture = Fixture::new();
        fixture.rollback_occurred = true;
        let result = fixture.decide("api", Some(&python_api()));
        assert!(!result.agent_enabled);
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::CrashLoopBackOff);
        assert_eq!(result.distro_name(), Some("python-community"));
        assert!(result.distro_params.is_some());
    }

    #[test]
    fn test_loader_conflicts() {
        let mut fixture = Fixture::new();
        fixture.config.agent_env_vars_injection_method = Some(EnvInjectionMethod::Loader);

        let result = fixture.decide("api", Some(&python_api()));
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::InjectionConflict);

        let mut details = python_api();
        details.secure_execution_mode = Some(false);
        details
            .env_vars
            .push(EnvVar::new("LD_PRELOAD", "/usr/lib/libjemalloc.so"));
        let result = fixture.decide("api", Some(&details));
        assert_eq!(result.agent_enabled_reason, AgentEnabledReason::InjectionConflict);
        assert!(result.agent_enabled_message.unwrap().contains("libjemalloc"));

        details.env_vars = vec![EnvVar::new("LD_PRELOAD", AGENT_LOADER_PATH)];
        let result = fixture.decide("api", Some(&details));
        assert!(result.agent_enabled);
    }

    #[test]
    fn test_injection_decision() {
        let distro = OtelDistro::new("python-community", ProgrammingLanguage::Python)
            .with_ld_preload_support();
        let mut details = python_api();
        let mut config = EffectiveConfig::default();

        assert_eq!(
            env_injection_decision(&config, &distro, &details),
            EnvInjectionDecision::PodManifest
        );
        details.secure_execution_mode = Some(false);
        assert_eq!(
            env_injection_decision(&config, &distro, &details),
            EnvInjectionDecision::Loader
        );

        config.agent_env_vars_injection_method = Some(EnvInjectionMethod::PodManifest);
        assert_eq!(
            env_injection_decision(&config, &distro, &details),
            EnvInjectionDecision::PodManifest
        );
    }
}
