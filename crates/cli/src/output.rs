//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use instrumentor_lib::{
    sampling::ContainerSampling, AgentEnabledReason, AttributeConditionOperator, ConditionStatus,
    HeadSamplingConfig, WorkloadEvaluation,
};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_rows<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn color_condition(status: ConditionStatus) -> String {
    let text = status.to_string();
    match status {
        ConditionStatus::True => text.green().to_string(),
        ConditionStatus::False => text.red().to_string(),
        ConditionStatus::Unknown => text.yellow().to_string(),
    }
}

/// Waiting reasons are yellow, permanent ones red
pub fn color_reason(reason: AgentEnabledReason) -> String {
    let text = reason.as_str();
    match reason {
        AgentEnabledReason::EnabledSuccessfully => text.green().to_string(),
        AgentEnabledReason::WaitingForRuntimeInspection
        | AgentEnabledReason::RuntimeDetailsUnavailable
        | AgentEnabledReason::WaitingForNodeCollector
        | AgentEnabledReason::NoCollectedSignals => text.yellow().to_string(),
        AgentEnabledReason::IgnoredContainer => text.dimmed().to_string(),
        _ => text.red().to_string(),
    }
}

/// Sampling fraction as a percentage, e.g. `0.25` as `25%`
pub fn format_fraction(fraction: f64) -> String {
    let percent = fraction * 100.0;
    if percent.fract() == 0.0 {
        format!("{:.0}%", percent)
    } else {
        format!("{:.2}%", percent)
    }
}

fn short_hash(hash: Option<&str>) -> String {
    hash.map(|h| h.chars().take(12).collect())
        .unwrap_or_else(|| "-".to_string())
}

#[derive(Tabled)]
struct WorkloadRow {
    #[tabled(rename = "Workload")]
    workload: String,
    #[tabled(rename = "Injection")]
    injection: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Hash")]
    hash: String,
}

#[derive(Tabled)]
struct ContainerRow {
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Distro")]
    distro: String,
    #[tabled(rename = "Signals")]
    signals: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Tabled)]
struct HeadRuleRow {
    #[tabled(rename = "Conditions")]
    conditions: String,
    #[tabled(rename = "Keep")]
    keep: String,
}

/// One line per workload
pub fn print_evaluations(evaluations: &[WorkloadEvaluation], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(evaluations),
        OutputFormat::Table => {
            if evaluations.is_empty() {
                print_warning("No workloads found");
                return Ok(());
            }

            let rows: Vec<WorkloadRow> = evaluations
                .iter()
                .map(|e| WorkloadRow {
                    workload: e.workload.to_string(),
                    injection: if e.agent_injection_enabled {
                        "on".green().to_string()
                    } else {
                        "off".to_string()
                    },
                    status: color_condition(e.condition.status),
                    reason: color_reason(e.condition.reason),
                    enabled: format!("{}/{}", e.enabled_containers().count(), e.containers.len()),
                    hash: short_hash(e.agents_meta_hash.as_deref()),
                })
                .collect();

            print_rows(rows);
            println!("\nTotal: {} workloads", evaluations.len());
            Ok(())
        }
    }
}

/// Condition, hash and per-container decisions for one workload
pub fn print_evaluation(evaluation: &WorkloadEvaluation, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(evaluation);
    }

    println!("{}", "Agent Enablement".bold());
    println!("{}", "=".repeat(60));
    println!("Workload:  {}", evaluation.workload.to_string().cyan());
    println!(
        "Condition: {} ({})",
        color_condition(evaluation.condition.status),
        color_reason(evaluation.condition.reason)
    );
    if !evaluation.condition.message.is_empty() {
        println!("Message:   {}", evaluation.condition.message);
    }
    println!(
        "Hash:      {}",
        evaluation.agents_meta_hash.as_deref().unwrap_or("-")
    );
    println!();

    if evaluation.containers.is_empty() {
        print_warning("No container decisions for this workload");
        return Ok(());
    }

    let rows: Vec<ContainerRow> = evaluation
        .containers
        .iter()
        .map(|c| {
            let mut signals = Vec::new();
            if c.traces.is_some() {
                signals.push("traces");
            }
            if c.metrics.is_some() {
                signals.push("metrics");
            }
            if c.logs.is_some() {
                signals.push("logs");
            }
            ContainerRow {
                container: c.container_name.clone(),
                enabled: if c.agent_enabled {
                    "yes".green().to_string()
                } else {
                    "no".to_string()
                },
                reason: color_reason(c.agent_enabled_reason),
                distro: c.distro_name().unwrap_or("-").to_string(),
                signals: if signals.is_empty() {
                    "-".to_string()
                } else {
                    signals.join(",")
                },
                message: c.agent_enabled_message.clone().unwrap_or_default(),
            }
        })
        .collect();

    print_rows(rows);
    Ok(())
}

fn describe_head_sampling(head: &HeadSamplingConfig) {
    println!(
        "  Head sampling (agent), fallback keep {}",
        format_fraction(head.fallback_fraction)
    );
    if head.attributes_and_sampler_rules.is_empty() {
        return;
    }
    let rows: Vec<HeadRuleRow> = head
        .attributes_and_sampler_rules
        .iter()
        .map(|rule| HeadRuleRow {
            conditions: rule
                .attribute_conditions
                .iter()
                .map(|c| match c.operator {
                    AttributeConditionOperator::Equals => format!("{} == {}", c.key, c.val),
                    AttributeConditionOperator::StartWith => format!("{} ^= {}", c.key, c.val),
                })
                .collect::<Vec<_>>()
                .join(" && "),
            keep: format_fraction(rule.fraction),
        })
        .collect();
    print_rows(rows);
}

fn describe_container_sampling(container: &str, sampling: &ContainerSampling) {
    println!("{}", container.bold());
    match &sampling.head_sampling {
        Some(head) => describe_head_sampling(head),
        None => println!("  Head sampling (agent): keep all"),
    }

    let tail = &sampling.tail_sampling;
    if tail.is_empty() {
        println!("  Tail sampling (collector): no rules");
    } else {
        println!(
            "  Tail sampling (collector): {} noisy, {} highly relevant, {} cost reduction",
            tail.noisy_operations.len(),
            tail.highly_relevant_operations.len(),
            tail.cost_reduction_rules.len()
        );
    }
}

/// Compiled head and tail sampling for each enabled container
pub fn print_sampling(evaluation: &WorkloadEvaluation, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(&evaluation.sampling);
    }

    println!("{}", "Sampling".bold());
    println!("{}", "=".repeat(60));
    println!("Workload: {}", evaluation.workload.to_string().cyan());
    println!();

    if evaluation.sampling.is_empty() {
        print_info("No enabled container emits traces, nothing to sample");
        return Ok(());
    }

    for (container, sampling) in &evaluation.sampling {
        describe_container_sampling(container, sampling);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_fraction() {
        assert_eq!(format_fraction(1.0), "100%");
        assert_eq!(format_fraction(0.25), "25%");
        assert_eq!(format_fraction(0.005), "0.50%");
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash(None), "-");
        assert_eq!(short_hash(Some("0123456789abcdef")), "0123456789ab");
    }
}
