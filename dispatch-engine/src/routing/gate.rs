//! RecalculationGate - decides whether a date's delivery plan is stale
//!
//! Checks run cheapest first: count, then stop-set hash, then assignment
//! hash. The gate never recomputes anything.

use super::storage::{RouteStorage, StorageResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::delivery::{DriverId, PlanFingerprint, StopId, stop_set_hash};
use std::collections::{HashMap, HashSet};

/// Why a plan is (or is not) stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Staleness {
    Fresh,
    NoSnapshot,
    CountChanged { stored: usize, current: usize },
    StopSetChanged,
    AssignmentChanged,
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Staleness::Fresh)
    }
}

/// Compare the current inputs with a stored fingerprint
pub fn evaluate_fingerprint(
    stored: Option<&PlanFingerprint>,
    ready_ids: &HashSet<StopId>,
    assignment: &HashMap<StopId, DriverId>,
) -> Staleness {
    let Some(stored) = stored else {
        return Staleness::NoSnapshot;
    };

    if stored.stop_count != ready_ids.len() {
        return Staleness::CountChanged {
            stored: stored.stop_count,
            current: ready_ids.len(),
        };
    }

    if stored.stop_set_hash != stop_set_hash(ready_ids.iter().map(String::as_str)) {
        return Staleness::StopSetChanged;
    }

    if stored.assignment_hash != PlanFingerprint::assignment_hash_for(ready_ids, assignment) {
        return Staleness::AssignmentChanged;
    }

    Staleness::Fresh
}

/// Reads the stored plan fingerprint for a date
#[derive(Clone)]
pub struct RecalculationGate {
    storage: RouteStorage,
}

impl RecalculationGate {
    pub fn new(storage: RouteStorage) -> Self {
        Self { storage }
    }

    pub fn evaluate(
        &self,
        delivery_date: NaiveDate,
        ready_ids: &HashSet<StopId>,
        assignment: &HashMap<StopId, DriverId>,
    ) -> StorageResult<Staleness> {
        let plan = self.storage.get_plan(delivery_date)?;
        let staleness = evaluate_fingerprint(plan.as_ref().map(|p| &p.fingerprint), ready_ids, assignment);
        tracing::debug!(%delivery_date, ?staleness, "Delivery plan staleness");
        Ok(staleness)
    }

    pub fn needs_recalculation(
        &self,
        delivery_date: NaiveDate,
        ready_ids: &HashSet<StopId>,
        assignment: &HashMap<StopId, DriverId>,
    ) -> StorageResult<bool> {
        Ok(self.evaluate(delivery_date, ready_ids, assignment)?.is_stale())
    }
}
