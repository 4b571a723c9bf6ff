//! Staleness fingerprints
//!
//! A fingerprint is a cheap summary of the inputs a route was computed from:
//! the stop count, a hash of the sorted stop-id set and a hash of the sorted
//! `(stop_id, driver_id)` assignment pairs. Hashes are hex SHA-256 over a
//! length-prefixed canonical encoding, so they are stable across processes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Hash of a stop-id set (order-insensitive)
pub fn stop_set_hash<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let mut sorted: Vec<&str> = ids.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut hasher = Sha256::new();
    for id in sorted {
        update_str(&mut hasher, id);
    }
    hex::encode(hasher.finalize())
}

/// Hash of `(stop_id, driver_id)` pairs (order-insensitive)
pub fn assignment_hash<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut sorted: Vec<(&str, &str)> = pairs.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut hasher = Sha256::new();
    for (stop_id, driver_id) in sorted {
        update_str(&mut hasher, stop_id);
        update_str(&mut hasher, driver_id);
    }
    hex::encode(hasher.finalize())
}

/// Count + id-set hash recorded on every route snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteFingerprint {
    pub stop_count: usize,
    pub stop_set_hash: String,
}

impl RouteFingerprint {
    pub fn of<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let ids: Vec<&str> = ids.into_iter().collect();
        let stop_count = ids.iter().collect::<HashSet<_>>().len();
        Self {
            stop_count,
            stop_set_hash: stop_set_hash(ids),
        }
    }
}

/// Fingerprint of a whole delivery plan, recorded at allocation time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanFingerprint {
    pub stop_count: usize,
    pub stop_set_hash: String,
    pub assignment_hash: String,
}

impl PlanFingerprint {
    /// Compute from the current ready set and driver assignment
    ///
    /// Assignment entries for stops outside `ready_ids` do not contribute.
    pub fn compute(ready_ids: &HashSet<String>, assignment: &HashMap<String, String>) -> Self {
        Self {
            stop_count: ready_ids.len(),
            stop_set_hash: stop_set_hash(ready_ids.iter().map(String::as_str)),
            assignment_hash: Self::assignment_hash_for(ready_ids, assignment),
        }
    }

    pub fn assignment_hash_for(
        ready_ids: &HashSet<String>,
        assignment: &HashMap<String, String>,
    ) -> String {
        assignment_hash(
            assignment
                .iter()
                .filter(|(stop_id, _)| ready_ids.contains(*stop_id))
                .map(|(stop_id, driver_id)| (stop_id.as_str(), driver_id.as_str())),
        )
    }
}
