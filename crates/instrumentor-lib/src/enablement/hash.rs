//! Rollout-trigger hash
//!
//! A fingerprint of which containers run which agent. Distro parameters are
//! left out since they can change without a restart being needed.

use crate::models::ContainerAgentConfig;
use sha2::{Digest, Sha256};

const HASH_BYTES: usize = 8;

fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Hex-encoded hash over `(name, enabled, distro)` of every container,
/// sorted by container name. Empty input yields an empty string.
pub fn agents_meta_hash(containers: &[ContainerAgentConfig]) -> String {
    if containers.is_empty() {
        return String::new();
    }

    let mut sorted: Vec<&ContainerAgentConfig> = containers.iter().collect();
    sorted.sort_by(|a, b| a.container_name.cmp(&b.container_name));

    let mut hasher = Sha256::new();
    for container in sorted {
        write_field(&mut hasher, container.container_name.as_bytes());
        hasher.update([u8::from(container.agent_enabled)]);
        write_field(&mut hasher, container.distro_name().unwrap_or("").as_bytes());
    }

    let digest = hasher.finalize();
    hex::encode(&digest[..HASH_BYTES])
}

/// Whether the persisted hash differs from a newly computed one. A missing
/// hash and an empty one are the same.
pub fn hash_changed(previous: Option<&str>, current: Option<&str>) -> bool {
    previous.unwrap_or("") != current.unwrap_or("")
}
