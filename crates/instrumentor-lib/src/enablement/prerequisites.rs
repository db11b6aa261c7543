//! Transient prerequisites that must hold before any agent is enabled
//!
//! Things we wait for:
//! 1. The node collector exists and is ready, so agents have a receiver.
//! 2. The collector receives at least one signal.
//! 3. Runtime details exist for the workload, either detected or overridden.
//!
//! Each may also be permanent (image pull errors, no running pods); the gate
//! cannot tell, so it reports a waiting reason and the host re-evaluates once
//! the blocking input changes.

use crate::models::{AgentEnabledReason, NodeCollectorsGroup, RuntimeDetectionReason};

/// Gate result when instrumentation cannot proceed yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waiting {
    pub reason: AgentEnabledReason,
    pub message: String,
}

impl Waiting {
    fn new(reason: AgentEnabledReason, message: &str) -> Self {
        Self {
            reason,
            message: message.to_string(),
        }
    }
}

/// Everything the gate looks at for one workload
#[derive(Debug, Clone, Copy)]
pub struct GateInputs<'a> {
    pub node_collectors_group: Option<&'a NodeCollectorsGroup>,
    pub has_runtime_overrides: bool,
    pub has_detected_runtime_details: bool,
    pub runtime_detection_reason: Option<RuntimeDetectionReason>,
}

/// Returns the collector group when instrumentation may proceed
pub fn check_prerequisites(inputs: GateInputs<'_>) -> Result<&NodeCollectorsGroup, Waiting> {
    let group = inputs.node_collectors_group.ok_or_else(|| {
        Waiting::new(
            AgentEnabledReason::WaitingForNodeCollector,
            "waiting for OpenTelemetry Collector to be created",
        )
    })?;

    if !group.ready {
        return Err(Waiting::new(
            AgentEnabledReason::WaitingForNodeCollector,
            "waiting for OpenTelemetry Collector to be ready",
        ));
    }

    if group.receiver_signals.is_empty() {
        return Err(Waiting::new(
            AgentEnabledReason::NoCollectedSignals,
            "no signals are being collected",
        ));
    }

    // any override is enough to proceed without detection
    if inputs.has_runtime_overrides || inputs.has_detected_runtime_details {
        return Ok(group);
    }

    match inputs.runtime_detection_reason {
        Some(RuntimeDetectionReason::NoRunningPods) => Err(Waiting::new(
            AgentEnabledReason::RuntimeDetailsUnavailable,
            "agent will be enabled once runtime details from running pods is available",
        )),
        _ => Err(Waiting::new(
            AgentEnabledReason::WaitingForRuntimeInspection,
            "waiting for runtime inspection to complete",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Signal;

    fn ready_group() -> NodeCollectorsGroup {
        NodeCollectorsGroup {
            ready: true,
            receiver_signals: vec![Signal::Traces],
        }
    }

    fn inputs(group: Option<&NodeCollectorsGroup>) -> GateInputs<'_> {
        GateInputs {
            node_collectors_group: group,
            has_runtime_overrides: false,
            has_detected_runtime_details: true,
            runtime_detection_reason: None,
        }
    }

    #[test]
    fn test_missing_collector() {
        let waiting = check_prerequisites(inputs(None)).unwrap_err();
        assert_eq!(waiting.reason, AgentEnabledReason::WaitingForNodeCollector);
        assert!(waiting.message.contains("created"));
    }

    #[test]
    fn test_collector_not_ready() {
        let group = NodeCollectorsGroup {
            ready: false,
            ..ready_group()
        };
        let waiting = check_prerequisites(inputs(Some(&group))).unwrap_err();
        assert_eq!(waiting.reason, AgentEnabledReason::WaitingForNodeCollector);
        assert!(waiting.message.contains("ready"));
    }

    #[test]
    fn test_no_receiver_signals() {
        let group = NodeCollectorsGroup {
            ready: true,
            receiver_signals: vec![],
        };
        let waiting = check_prerequisites(inputs(Some(&group))).unwrap_err();
        assert_eq!(waiting.reason, AgentEnabledReason::NoCollectedSignals);
    }

    #[test]
    fn test_runtime_detection_states() {
        let group = ready_group();
        let mut gate = inputs(Some(&group));
        gate.has_detected_runtime_details = false;

        let waiting = check_prerequisites(gate).unwrap_err();
        assert_eq!(waiting.reason, AgentEnabledReason::WaitingForRuntimeInspection);

        gate.runtime_detection_reason = Some(RuntimeDetectionReason::NoRunningPods);
        let waiting = check_prerequisites(gate).unwrap_err();
        assert_eq!(waiting.reason, AgentEnabledReason::RuntimeDetailsUnavailable);

        gate.has_runtime_overrides = true;
        assert!(check_prerequisites(gate).is_ok());
    }
}
