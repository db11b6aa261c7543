//! Distro parameter resolution
//!
//! Extracts the values a distro needs at injection time from the detected
//! runtime details, so the injector only deals with validated data.

use super::version;
use crate::config::EnvInjectionDecision;
use crate::distro::{OtelDistro, LIBC_TYPE_PARAMETER, RUNTIME_VERSION_MAJOR_MINOR_PARAMETER};
use crate::models::{DistroParams, RuntimeDetailsByContainer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistroParamError {
    #[error("OpenTelemetry distribution '{distro}' requires a libc type, but none was detected. Instrumentation disabled.")]
    MissingLibcType { distro: String },

    #[error("OpenTelemetry distribution '{distro}' requires a runtime version, but none was detected. Instrumentation disabled.")]
    MissingRuntimeVersion { distro: String },

    #[error("OpenTelemetry distribution '{distro}' requires a runtime version, but the detected version '{version}' is invalid. Instrumentation disabled.")]
    InvalidRuntimeVersion { distro: String, version: String },

    #[error("unsupported parameter '{parameter}' for distro '{distro}'")]
    UnsupportedParameter { parameter: String, distro: String },

    #[error("failed to detect environment variables from container runtime: {0}")]
    ContainerRuntimeEnv(String),
}

fn resolve_required_parameter(
    distro: &OtelDistro,
    details: &RuntimeDetailsByContainer,
    parameter: &str,
) -> Result<String, DistroParamError> {
    match parameter {
        LIBC_TYPE_PARAMETER => details
            .libc_type
            .map(|libc| libc.as_str().to_string())
            .ok_or_else(|| DistroParamError::MissingLibcType {
                distro: distro.name.clone(),
            }),
        RUNTIME_VERSION_MAJOR_MINOR_PARAMETER => {
            let detected =
                details
                    .runtime_version()
                    .ok_or_else(|| DistroParamError::MissingRuntimeVersion {
                        distro: distro.name.clone(),
                    })?;
            version::major_minor(detected).map_err(|_| DistroParamError::InvalidRuntimeVersion {
                distro: distro.name.clone(),
                version: detected.to_string(),
            })
        }
        other => Err(DistroParamError::UnsupportedParameter {
            parameter: other.to_string(),
            distro: distro.name.clone(),
        }),
    }
}

/// Values of the distro's append variables as declared by the image
fn append_env_parameters(
    distro: &OtelDistro,
    details: &RuntimeDetailsByContainer,
) -> Result<DistroParams, DistroParamError> {
    if let Some(message) = &details.cri_error_message {
        return Err(DistroParamError::ContainerRuntimeEnv(message.clone()));
    }

    let params = distro
        .environment_variables
        .append_odigos_variables
        .iter()
        .filter_map(|var| {
            details
                .container_runtime_env(&var.env_name)
                .filter(|value| !value.is_empty())
                .map(|value| (var.env_name.clone(), value.to_string()))
        })
        .collect();
    Ok(params)
}

/// Resolves every parameter the distro needs. The first failure aborts.
/// Returns `None` rather than an empty map when nothing was produced.
pub fn resolve_distro_params(
    distro: &OtelDistro,
    details: &RuntimeDetailsByContainer,
    injection: EnvInjectionDecision,
) -> Result<Option<DistroParams>, DistroParamError> {
    let mut params = DistroParams::new();

    for parameter in &distro.require_parameters {
        let value = resolve_required_parameter(distro, details, parameter)?;
        params.insert(parameter.clone(), value);
    }

    if injection == EnvInjectionDecision::PodManifest && distro.has_append_env_vars() {
        params.extend(append_env_parameters(distro, details)?);
    }

    Ok((!params.is_empty()).then_some(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnvVar, LibCType, ProgrammingLanguage};

    fn python_details() -> RuntimeDetailsByContainer {
        RuntimeDetailsByContainer::new("api", ProgrammingLanguage::Python)
    }

    #[test]
    fn test_libc_type_required() {
        let distro = OtelDistro::new("python-community", ProgrammingLanguage::Python)
            .with_required_parameter(LIBC_TYPE_PARAMETER);

        let err = resolve_distro_params(&distro, &python_details(), EnvInjectionDecision::Loader)
            .unwrap_err();
        assert!(matches!(err, DistroParamError::MissingLibcType { .. }));

        let details = python_details().with_libc_type(LibCType::Musl);
        let params = resolve_distro_params(&distro, &details, EnvInjectionDecision::Loader)
            .unwrap()
            .unwrap();
        assert_eq!(params["libcType"], "musl");
    }

    #[test]
    fn test_runtime_version_major_minor() {
        let distro = OtelDistro::new("php-community", ProgrammingLanguage::Php)
            .with_required_parameter(RUNTIME_VERSION_MAJOR_MINOR_PARAMETER);

        let details = RuntimeDetailsByContainer::new("web", ProgrammingLanguage::Php)
            .with_runtime_version("8.2.7");
        let params = resolve_distro_params(&distro, &details, EnvInjectionDecision::Loader)
            .unwrap()
            .unwrap();
        assert_eq!(params["runtimeVersionMajorMinor"], "8.2");

        let garbage = RuntimeDetailsByContainer::new("web", ProgrammingLanguage::Php)
            .with_runtime_version("eight");
        assert!(matches!(
            resolve_distro_params(&distro, &garbage, EnvInjectionDecision::Loader),
            Err(DistroParamError::InvalidRuntimeVersion { .. })
        ));
    }

    #[test]
    fn test_unknown_parameter() {
        let distro = OtelDistro::new("custom", ProgrammingLanguage::Go)
            .with_required_parameter("kernelVersion");
        let details = RuntimeDetailsByContainer::new("svc", ProgrammingLanguage::Go);
        let err = resolve_distro_params(&distro, &details, EnvInjectionDecision::Loader)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported parameter 'kernelVersion' for distro 'custom'"
        );
    }

    #[test]
    fn test_append_env_only_for_pod_manifest() {
        let distro = OtelDistro::new("python-community", ProgrammingLanguage::Python)
            .with_append_env("PYTHONPATH");
        let mut details = python_details();
        details
            .env_from_container_runtime
            .push(EnvVar::new("PYTHONPATH", "/app/lib"));

        let loader = resolve_distro_params(&distro, &details, EnvInjectionDecision::Loader);
        assert_eq!(loader, Ok(None));

        let manifest =
            resolve_distro_params(&distro, &details, EnvInjectionDecision::PodManifest).unwrap();
        assert_eq!(manifest.unwrap()["PYTHONPATH"], "/app/lib");
    }

    #[test]
    fn test_empty_append_value_yields_none() {
        let distro = OtelDistro::new("python-community", ProgrammingLanguage::Python)
            .with_append_env("PYTHONPATH");
        let mut details = python_details();
        details
            .env_from_container_runtime
            .push(EnvVar::new("PYTHONPATH", ""));

        let params =
            resolve_distro_params(&distro, &details, EnvInjectionDecision::PodManifest).unwrap();
        assert_eq!(params, None);
    }

    #[test]
    fn test_cri_error_fails_append_env() {
        let distro = OtelDistro::new("python-community", ProgrammingLanguage::Python)
            .with_append_env("PYTHONPATH");
        let mut details = python_details();
        details.cri_error_message = Some("connection refused".to_string());

        let err = resolve_distro_params(&distro, &details, EnvInjectionDecision::PodManifest)
            .unwrap_err();
        assert_eq!(
            err,
            DistroParamError::ContainerRuntimeEnv("connection refused".to_string())
        );
    }
}
