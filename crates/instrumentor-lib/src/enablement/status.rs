use crate::models::{
    AgentEnabledCondition, AgentEnabledReason, ConditionStatus, ContainerAgentConfig,
};

/// Condition type written to the workload status
pub const AGENT_ENABLED_CONDITION_TYPE: &str = "AgentEnabled";

fn condition(
    status: ConditionStatus,
    reason: AgentEnabledReason,
    message: impl Into<String>,
) -> AgentEnabledCondition {
    AgentEnabledCondition {
        condition_type: AGENT_ENABLED_CONDITION_TYPE.to_string(),
        status,
        reason,
        message: message.into(),
    }
}

/// Condition reported while prerequisites are not met
pub fn waiting_condition(reason: AgentEnabledReason, message: &str) -> AgentEnabledCondition {
    condition(ConditionStatus::Unknown, reason, message)
}

/// Folds per-container decisions into the workload condition.
///
/// Returns whether agent injection is enabled for the workload. When no
/// container is enabled, the container whose reason has the highest
/// priority explains the workload; the first one wins ties.
pub fn aggregate_status(containers: &[ContainerAgentConfig]) -> (bool, AgentEnabledCondition) {
    let enabled: Vec<&str> = containers
        .iter()
        .filter(|c| c.agent_enabled)
        .map(|c| c.container_name.as_str())
        .collect();

    if !enabled.is_empty() {
        let message = format!(
            "agent enabled in {} containers: {}",
            enabled.len(),
            enabled.join(", ")
        );
        return (
            true,
            condition(
                ConditionStatus::True,
                AgentEnabledReason::EnabledSuccessfully,
                message,
            ),
        );
    }

    let mut selected: Option<&ContainerAgentConfig> = None;
    for container in containers {
        let outranks = selected.map_or(true, |current| {
            container.agent_enabled_reason.priority() > current.agent_enabled_reason.priority()
        });
        if outranks {
            selected = Some(container);
        }
    }

    match selected {
        Some(container) => (
            false,
            condition(
                ConditionStatus::False,
                container.agent_enabled_reason,
                container.agent_enabled_message.clone().unwrap_or_default(),
            ),
        ),
        None => (
            false,
            waiting_condition(
                AgentEnabledReason::WaitingForRuntimeInspection,
                "no containers found for workload",
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnabledSignals, Signal};

    fn signals() -> EnabledSignals {
        [Signal::Traces].into_iter().collect()
    }

    #[test]
    fn test_any_enabled_container_enables_workload() {
        let containers = vec![
            ContainerAgentConfig::disabled("proxy", AgentEnabledReason::IgnoredContainer),
            ContainerAgentConfig::enabled("api", "python-community", None, &signals()),
            ContainerAgentConfig::enabled("worker", "python-community", None, &signals()),
        ];
        let (enabled, condition) = aggregate_status(&containers);
        assert!(enabled);
        assert_eq!(condition.status, ConditionStatus::True);
        assert_eq!(condition.reason, AgentEnabledReason::EnabledSuccessfully);
        assert_eq!(condition.message, "agent enabled in 2 containers: api, worker");
        assert_eq!(condition.condition_type, "AgentEnabled");
    }

    #[test]
    fn test_highest_priority_reason_surfaces() {
        let containers = vec![
            ContainerAgentConfig::disabled("a", AgentEnabledReason::UnsupportedProgrammingLanguage)
                .with_message("unsupported"),
            ContainerAgentConfig::disabled("b", AgentEnabledReason::OtherAgentDetected)
                .with_message("other agent"),
            ContainerAgentConfig::disabled("c", AgentEnabledReason::IgnoredContainer),
        ];
        let (enabled, condition) = aggregate_status(&containers);
        assert!(!enabled);
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason, AgentEnabledReason::OtherAgentDetected);
        assert_eq!(condition.message, "other agent");
    }

    #[test]
    fn test_first_container_wins_ties() {
        let containers = vec![
            ContainerAgentConfig::disabled("a", AgentEnabledReason::NoAvailableAgent)
                .with_message("first"),
            ContainerAgentConfig::disabled("b", AgentEnabledReason::NoAvailableAgent)
                .with_message("second"),
        ];
        let (_, condition) = aggregate_status(&containers);
        assert_eq!(condition.message, "first");
    }

    #[test]
    fn test_no_containers() {
        let (enabled, condition) = aggregate_status(&[]);
        assert!(!enabled);
        assert_eq!(condition.status, ConditionStatus::Unknown);
    }
}
