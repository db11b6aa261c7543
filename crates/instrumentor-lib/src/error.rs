//! Error types for loading inputs
//!
//! Enablement decisions never fail: ineligibility is reported as a reason on
//! the decision. These errors only cover reading and parsing the inputs.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseModelError {
    #[error("unknown workload kind '{0}'")]
    WorkloadKind(String),

    #[error("invalid workload '{0}', expected namespace/kind/name")]
    PodWorkload(String),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read distro catalog {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse distro catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("distro '{0}' is defined more than once")]
    DuplicateDistro(String),

    #[error("default distro '{distro}' for language '{language}' is not in the catalog")]
    UnknownDefault { language: String, distro: String },

    #[error("default distro '{distro}' targets '{actual}', not '{language}'")]
    DefaultLanguageMismatch {
        language: String,
        distro: String,
        actual: String,
    },
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read state snapshot {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON state snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML state snapshot: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
