//! Runtime version parsing and supported-range checks

use semver::{Version, VersionReq};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeVersionError {
    #[error("failed to parse supported versions constraint: {0}")]
    InvalidConstraint(String),

    #[error("failed to parse runtime version: {0}")]
    InvalidVersion(String),

    #[error("{environment} runtime not supported by OpenTelemetry. supported versions: '{constraint}', found: {version}")]
    Unsupported {
        environment: String,
        constraint: String,
        version: String,
    },
}

/// Parses a detected runtime version. Besides strict semver this accepts a
/// leading `v`, missing minor or patch segments (`3.11` is read as `3.11.0`),
/// a fourth segment as in JDK `11.0.20.1` (kept as build metadata) and a
/// prerelease glued to the patch as in CPython `3.12.0rc1`.
pub fn parse_runtime_version(input: &str) -> Result<Version, semver::Error> {
    let input = input.trim();
    let input = input.strip_prefix('v').unwrap_or(input);
    match Version::parse(input) {
        Ok(version) => Ok(version),
        Err(original_err) => normalize(input)
            .and_then(|normalized| Version::parse(&normalized).ok())
            .ok_or(original_err),
    }
}

/// Rewrites a loose version into `major.minor.patch[-pre][+build]`
fn normalize(input: &str) -> Option<String> {
    let (core, rest) = split_version_core_suffix(input);
    let segments: Vec<&str> = core.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return None;
    }

    let mut numbers = [0u64; 3];
    for (slot, segment) in numbers.iter_mut().zip(&segments) {
        *slot = segment.parse().ok()?;
    }
    let extra = segments.get(3..).unwrap_or_default().join(".");

    let (pre, build) = match rest.split_once('+') {
        Some((pre, build)) => (pre, build),
        None => (rest, ""),
    };
    let pre = pre.strip_prefix('-').unwrap_or(pre);
    let build = match (extra.is_empty(), build.is_empty()) {
        (true, _) => build.to_string(),
        (false, true) => extra,
        (false, false) => format!("{extra}.{build}"),
    };

    let mut normalized = format!("{}.{}.{}", numbers[0], numbers[1], numbers[2]);
    if !pre.is_empty() {
        normalized.push('-');
        normalized.push_str(pre);
    }
    if !build.is_empty() {
        normalized.push('+');
        normalized.push_str(&build);
    }
    Some(normalized)
}

/// Splits at the first character that is neither a digit nor a dot
fn split_version_core_suffix(input: &str) -> (&str, &str) {
    match input.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&input[..idx], &input[idx..]),
        None => (input, ""),
    }
}

/// `major.minor` form of a detected runtime version, e.g. `3.11`
pub fn major_minor(input: &str) -> Result<String, semver::Error> {
    let version = parse_runtime_version(input)?;
    Ok(format!("{}.{}", version.major, version.minor))
}

/// Checks a detected version against a distro's supported range
pub fn check_supported(
    environment: &str,
    constraint: &str,
    detected: &str,
) -> Result<(), RuntimeVersionError> {
    let req = VersionReq::parse(constraint)
        .map_err(|_| RuntimeVersionError::InvalidConstraint(constraint.to_string()))?;
    let version = parse_runtime_version(detected)
        .map_err(|_| RuntimeVersionError::InvalidVersion(detected.to_string()))?;

    // a prerelease is judged by its release core, so `21.0.1-ea` satisfies `>= 8`
    let core = Version::new(version.major, version.minor, version.patch);
    if req.matches(&version) || (!version.pre.is_empty() && req.matches(&core)) {
        Ok(())
    } else {
        Err(RuntimeVersionError::Unsupported {
            environment: environment.to_string(),
            constraint: constraint.to_string(),
            version: detected.to_string(),
        })
    }
}
