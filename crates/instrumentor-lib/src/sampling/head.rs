//! Head sampling compiled into the agent of one container

use super::scope::is_in_scope;
use crate::config::{percentage_to_fraction, EffectiveConfig};
use crate::distro::OtelDistro;
use crate::models::{
    AttributeCondition, AttributesAndSamplerRule, HeadSamplingConfig, PodWorkload,
};
use crate::rules::{
    HeadSamplingHttpClientOperationMatcher, HeadSamplingHttpServerOperationMatcher, NoisyOperation,
    Sampling,
};
use k8s_openapi::api::core::v1::{Container, PodSpec, Probe};
use opentelemetry_semantic_conventions::attribute::{
    HTTP_REQUEST_METHOD, SERVER_ADDRESS, URL_PATH,
};
use std::collections::BTreeSet;

/// Kubelet probes without a path hit the root
const DEFAULT_PROBE_PATH: &str = "/";

/// Span attribute keys the agent records, after distro overrides
struct AttributeKeys<'a> {
    url_path: &'a str,
    http_request_method: &'a str,
    server_address: &'a str,
}

impl<'a> AttributeKeys<'a> {
    fn for_distro(distro: &'a OtelDistro) -> Self {
        let support = distro.head_sampling();
        let pick = |key: Option<&'a String>, default: &'static str| -> &'a str {
            key.map(String::as_str).filter(|k| !k.is_empty()).unwrap_or(default)
        };
        Self {
            url_path: pick(support.and_then(|s| s.url_path_attribute_key.as_ref()), URL_PATH),
            http_request_method: pick(
                support.and_then(|s| s.http_request_method_attribute_key.as_ref()),
                HTTP_REQUEST_METHOD,
            ),
            server_address: pick(
                support.and_then(|s| s.server_address_attribute_key.as_ref()),
                SERVER_ADDRESS,
            ),
        }
    }
}

fn probe_http_get_path(probe: Option<&Probe>) -> Option<String> {
    let http_get = probe?.http_get.as_ref()?;
    let path = http_get
        .path
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PROBE_PATH);
    Some(path.to_string())
}

/// Distinct HTTP GET paths of the startup, liveness and readiness probes
pub fn kubelet_probe_paths(pod_spec: &PodSpec, container_name: &str) -> BTreeSet<String> {
    pod_spec
        .containers
        .iter()
        .filter(|c| c.name == container_name)
        .flat_map(|c: &Container| {
            [
                probe_http_get_path(c.startup_probe.as_ref()),
                probe_http_get_path(c.liveness_probe.as_ref()),
                probe_http_get_path(c.readiness_probe.as_ref()),
            ]
        })
        .flatten()
        .collect()
}

fn kubelet_probe_rules(
    config: &EffectiveConfig,
    keys: &AttributeKeys<'_>,
    pod_spec: Option<&PodSpec>,
    container_name: &str,
) -> Vec<AttributesAndSamplerRule> {
    if !config.health_probes_sampling_enabled() {
        return Vec::new();
    }
    let Some(pod_spec) = pod_spec else {
        return Vec::new();
    };

    let fraction = config.health_probes_keep_fraction();
    kubelet_probe_paths(pod_spec, container_name)
        .into_iter()
        .map(|path| AttributesAndSamplerRule {
            attribute_conditions: vec![
                AttributeCondition::equals(keys.url_path, path),
                // probes configured with httpGet are always sent as GET
                AttributeCondition::equals(keys.http_request_method, "GET"),
            ],
            fraction,
        })
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn http_server_conditions(
    matcher: &HeadSamplingHttpServerOperationMatcher,
    keys: &AttributeKeys<'_>,
) -> Vec<AttributeCondition> {
    let mut conditions = Vec::new();
    if let Some(route) = non_empty(&matcher.route) {
        conditions.push(AttributeCondition::equals(keys.url_path, route));
    }
    if let Some(prefix) = non_empty(&matcher.route_prefix) {
        conditions.push(AttributeCondition::starts_with(keys.url_path, prefix));
    }
    if let Some(method) = non_empty(&matcher.method) {
        conditions.push(AttributeCondition::equals(keys.http_request_method, method));
    }
    conditions
}

fn http_client_conditions(
    matcher: &HeadSamplingHttpClientOperationMatcher,
    keys: &AttributeKeys<'_>,
) -> Vec<AttributeCondition> {
    let mut conditions = Vec::new();
    if let Some(address) = non_empty(&matcher.server_address) {
        conditions.push(AttributeCondition::equals(keys.server_address, address));
    }
    if let Some(path) = non_empty(&matcher.url_path) {
        conditions.push(AttributeCondition::equals(keys.url_path, path));
    }
    if let Some(method) = non_empty(&matcher.method) {
        conditions.push(AttributeCondition::equals(keys.http_request_method, method));
    }
    conditions
}

fn noisy_operation_conditions(
    noisy: &NoisyOperation,
    keys: &AttributeKeys<'_>,
) -> Vec<AttributeCondition> {
    let Some(operation) = &noisy.operation else {
        return Vec::new();
    };
    if let Some(server) = &operation.http_server {
        return http_server_conditions(server, keys);
    }
    if let Some(client) = &operation.http_client {
        return http_client_conditions(client, keys);
    }
    Vec::new()
}

/// Noisy operations in scope for this container. Operations without any
/// attribute condition lower the ambient fraction instead of becoming rules.
fn noisy_operation_rules(
    sampling_rules: &[Sampling],
    keys: &AttributeKeys<'_>,
    distro: &OtelDistro,
    workload: &PodWorkload,
    container_name: &str,
) -> (Vec<AttributesAndSamplerRule>, f64) {
    let mut rules = Vec::new();
    let mut ambient_fraction = 1.0_f64;

    let in_scope = sampling_rules
        .iter()
        .filter(|sampling| !sampling.disabled)
        .flat_map(|sampling| sampling.noisy_operations.iter())
        .filter(|noisy| {
            is_in_scope(&noisy.source_scopes, workload, container_name, distro.language)
        });

    for noisy in in_scope {
        let fraction = noisy
            .percentage_at_most
            .map(percentage_to_fraction)
            .unwrap_or(0.0);
        let conditions = noisy_operation_conditions(noisy, keys);
        if conditions.is_empty() {
            ambient_fraction = ambient_fraction.min(fraction);
        } else {
            rules.push(AttributesAndSamplerRule {
                attribute_conditions: conditions,
                fraction,
            });
        }
    }

    (rules, ambient_fraction)
}

/// Compiles the head sampling config for one container.
///
/// `None` when the distro cannot sample at the head, or when nothing would
/// change the default of keeping every trace.
pub fn compile_head_sampling(
    distro: &OtelDistro,
    config: &EffectiveConfig,
    sampling_rules: &[Sampling],
    workload: &PodWorkload,
    container_name: &str,
    pod_spec: Option<&PodSpec>,
) -> Option<HeadSamplingConfig> {
    if !distro.supports_head_sampling() {
        return None;
    }
    let keys = AttributeKeys::for_distro(distro);

    let mut rules = kubelet_probe_rules(config, &keys, pod_spec, container_name);
    let (custom_rules, ambient_fraction) =
        noisy_operation_rules(sampling_rules, &keys, distro, workload, container_name);

    if rules.is_empty() && custom_rules.is_empty() && ambient_fraction >= 1.0 {
        return None;
    }

    rules.extend(custom_rules);
    Some(HeadSamplingConfig {
        attributes_and_sampler_rules: rules,
        fallback_fraction: ambient_fraction,
    })
}
