//! OpenTelemetry distribution metadata
//!
//! A distro is a data record describing one instrumentation bundle. Dispatch
//! is a name lookup in [`DistroCatalog`] plus capability checks on the record.

mod catalog;

pub use catalog::{DistroCatalog, DistroPerLanguage};

use crate::models::ProgrammingLanguage;
use serde::{Deserialize, Serialize};

/// Substituted with the detected `major.minor` runtime version at injection time
pub const RUNTIME_VERSION_PLACEHOLDER: &str = "{{RUNTIME_VERSION_MAJOR_MINOR}}";

/// Distro parameter carrying the detected libc flavour
pub const LIBC_TYPE_PARAMETER: &str = "libcType";

/// Distro parameter carrying the detected runtime version as `major.minor`
pub const RUNTIME_VERSION_MAJOR_MINOR_PARAMETER: &str = "runtimeVersionMajorMinor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEnvironment {
    /// e.g. `CPython`, `JVM`, `nodejs`
    pub name: String,
    /// Version constraint, e.g. `>= 3.8`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_versions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticEnvironmentVariable {
    pub env_name: String,
    pub env_value: String,
}

/// Variable whose value from the image must be kept and appended to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendOdigosVariable {
    pub env_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariables {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_variables: Vec<StaticEnvironmentVariable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append_odigos_variables: Vec<AppendOdigosVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeAgentEnvironmentVariable {
    pub env_name: String,
    pub env_value: String,
    #[serde(default)]
    pub delimiter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeAgent {
    #[serde(default)]
    pub directory_names: Vec<String>,
    #[serde(default)]
    pub ld_preload_injection_supported: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<RuntimeAgentEnvironmentVariable>,
}

/// Head sampling capability and the attribute keys the agent reports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadSamplingSupport {
    #[serde(default)]
    pub supported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path_attribute_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_request_method_attribute_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_address_attribute_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistroTraces {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_sampling: Option<HeadSamplingSupport>,
}

/// Catalog entry for one instrumentation bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtelDistro {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub language: ProgrammingLanguage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require_parameters: Vec<String>,
    #[serde(default)]
    pub runtime_environments: Vec<RuntimeEnvironment>,
    #[serde(default)]
    pub environment_variables: EnvironmentVariables,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_agent: Option<RuntimeAgent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces: Option<DistroTraces>,
    #[serde(default)]
    pub description: String,
}

impl OtelDistro {
    pub fn new(name: impl Into<String>, language: ProgrammingLanguage) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            language,
            require_parameters: Vec::new(),
            runtime_environments: Vec::new(),
            environment_variables: EnvironmentVariables::default(),
            runtime_agent: None,
            traces: None,
            description: String::new(),
        }
    }

    pub fn with_required_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.require_parameters.push(parameter.into());
        self
    }

    pub fn with_runtime_environment(
        mut self,
        name: impl Into<String>,
        supported_versions: Option<&str>,
    ) -> Self {
        self.runtime_environments.push(RuntimeEnvironment {
            name: name.into(),
            supported_versions: supported_versions.map(str::to_string),
        });
        self
    }

    pub fn with_static_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables
            .static_variables
            .push(StaticEnvironmentVariable {
                env_name: name.into(),
                env_value: value.into(),
            });
        self
    }

    pub fn with_append_env(mut self, name: impl Into<String>) -> Self {
        self.environment_variables
            .append_odigos_variables
            .push(AppendOdigosVariable {
                env_name: name.into(),
            });
        self
    }

    pub fn with_ld_preload_support(mut self) -> Self {
        self.runtime_agent
            .get_or_insert_with(RuntimeAgent::default)
            .ld_preload_injection_supported = true;
        self
    }

    pub fn with_head_sampling(mut self, support: HeadSamplingSupport) -> Self {
        self.traces = Some(DistroTraces {
            head_sampling: Some(support),
        });
        self
    }

    /// The version constraint to enforce, present only when the distro
    /// targets exactly one runtime environment
    pub fn single_runtime_constraint(&self) -> Option<(&str, &str)> {
        match self.runtime_environments.as_slice() {
            [env] => env
                .supported_versions
                .as_deref()
                .map(|constraint| (env.name.as_str(), constraint)),
            _ => None,
        }
    }

    pub fn has_append_env_vars(&self) -> bool {
        !self.environment_variables.append_odigos_variables.is_empty()
    }

    pub fn ld_preload_supported(&self) -> bool {
        self.runtime_agent
            .as_ref()
            .map(|agent| agent.ld_preload_injection_supported)
            .unwrap_or(false)
    }

    pub fn head_sampling(&self) -> Option<&HeadSamplingSupport> {
        self.traces
            .as_ref()
            .and_then(|traces| traces.head_sampling.as_ref())
            .filter(|hs| hs.supported)
    }

    pub fn supports_head_sampling(&self) -> bool {
        self.head_sampling().is_some()
    }

    /// Whether any injected value must be templated with the runtime version
    pub fn uses_runtime_version_placeholder(&self) -> bool {
        let in_static = self
            .environment_variables
            .static_variables
            .iter()
            .any(|var| var.env_value.contains(RUNTIME_VERSION_PLACEHOLDER));
        let in_agent = self.runtime_agent.as_ref().is_some_and(|agent| {
            agent
                .environment_variables
                .iter()
                .any(|var| var.env_value.contains(RUNTIME_VERSION_PLACEHOLDER))
        });
        in_static || in_agent
    }
}
