//! DriverSequenceAllocator - splits the global route into driver-contiguous sequences
//!
//! Within each driver the relative order of the global route is preserved;
//! ranks restart at 1 per driver and the packing rank is the exact reverse.
//! Stops without a driver form the unassigned group and keep only the
//! global fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::delivery::{DriverId, RouteSnapshot, Stop, StopId};
use std::collections::{HashMap, HashSet};

/// Sequence fields for one stop of an allocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SequencedStop {
    pub stop_id: StopId,
    pub delivery_sequence: u32,
    pub packing_sequence: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_delivery_sequence: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_packing_sequence: Option<u32>,
}

/// One driver's stops (or the unassigned group), in delivery order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverSequenceResult {
    /// `None` for the unassigned group
    pub driver_id: Option<DriverId>,
    pub stops: Vec<SequencedStop>,
}

impl DriverSequenceResult {
    fn new(driver_id: Option<DriverId>) -> Self {
        Self {
            driver_id,
            stops: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stop_ids(&self) -> Vec<&str> {
        self.stops.iter().map(|s| s.stop_id.as_str()).collect()
    }

    /// Re-rank driver-local fields from the current `stops` order
    fn rank(&mut self) {
        if self.driver_id.is_none() {
            for stop in &mut self.stops {
                stop.driver_delivery_sequence = None;
                stop.driver_packing_sequence = None;
            }
            return;
        }
        let n = self.stops.len() as u32;
        for (idx, stop) in self.stops.iter_mut().enumerate() {
            let rank = idx as u32 + 1;
            stop.driver_delivery_sequence = Some(rank);
            stop.driver_packing_sequence = Some(n - rank + 1);
        }
    }

    /// Same group, stops in pack order (last delivered first)
    fn reversed(&self) -> Self {
        Self {
            driver_id: self.driver_id.clone(),
            stops: self.stops.iter().rev().cloned().collect(),
        }
    }
}

/// Result of splitting a global delivery route across drivers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    pub delivery_date: NaiveDate,
    /// Driver groups in first-seen order along the global route
    pub drivers: Vec<DriverSequenceResult>,
    pub unassigned: DriverSequenceResult,
}

/// Split `global` by driver
///
/// Pure and idempotent. Assignment entries for stops absent from the
/// snapshot are ignored.
pub fn allocate(global: &RouteSnapshot, assignment: &HashMap<StopId, DriverId>) -> Allocation {
    let n = global.len() as u32;
    let mut drivers: Vec<DriverSequenceResult> = Vec::new();
    let mut driver_index: HashMap<&str, usize> = HashMap::new();
    let mut unassigned = DriverSequenceResult::new(None);

    for (idx, stop_id) in global.stop_ids.iter().enumerate() {
        let rank = idx as u32 + 1;
        let entry = SequencedStop {
            stop_id: stop_id.clone(),
            delivery_sequence: rank,
            packing_sequence: n - rank + 1,
            driver_delivery_sequence: None,
            driver_packing_sequence: None,
        };

        match assignment.get(stop_id) {
            Some(driver_id) => {
                let slot = *driver_index.entry(driver_id.as_str()).or_insert_with(|| {
                    drivers.push(DriverSequenceResult::new(Some(driver_id.clone())));
                    drivers.len() - 1
                });
                drivers[slot].stops.push(entry);
            }
            None => unassigned.stops.push(entry),
        }
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        let on_route: HashSet<&str> = global.stop_ids.iter().map(String::as_str).collect();
        let ignored: Vec<&str> = assignment
            .keys()
            .map(String::as_str)
            .filter(|id| !on_route.contains(id))
            .collect();
        if !ignored.is_empty() {
            tracing::debug!(
                ignored = ?ignored,
                "Assignment entries for stops outside the route ignored"
            );
        }
    }

    for group in &mut drivers {
        group.rank();
    }
    unassigned.rank();

    Allocation {
        delivery_date: global.key.delivery_date,
        drivers,
        unassigned,
    }
}

impl Allocation {
    /// Driver ids in first-seen order (stable palette index)
    pub fn driver_order(&self) -> Vec<&str> {
        self.drivers
            .iter()
            .filter_map(|g| g.driver_id.as_deref())
            .collect()
    }

    pub fn driver(&self, driver_id: &str) -> Option<&DriverSequenceResult> {
        self.drivers
            .iter()
            .find(|g| g.driver_id.as_deref() == Some(driver_id))
    }

    pub fn find(&self, stop_id: &str) -> Option<&SequencedStop> {
        self.drivers
            .iter()
            .chain(std::iter::once(&self.unassigned))
            .flat_map(|g| g.stops.iter())
            .find(|s| s.stop_id == stop_id)
    }

    pub fn stop_count(&self) -> usize {
        self.drivers.iter().map(|g| g.len()).sum::<usize>() + self.unassigned.len()
    }

    /// Replace one driver's visiting order and re-rank its driver fields
    ///
    /// Stops of the driver missing from `order` keep their relative order
    /// after the listed ones. Global fields are untouched.
    pub fn reorder_driver(&mut self, driver_id: &str, order: &[StopId]) {
        let Some(group) = self
            .drivers
            .iter_mut()
            .find(|g| g.driver_id.as_deref() == Some(driver_id))
        else {
            return;
        };

        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.as_str(), idx))
            .collect();
        // Stable sort: unlisted stops share usize::MAX and keep their order
        group
            .stops
            .sort_by_key(|s| position.get(s.stop_id.as_str()).copied().unwrap_or(usize::MAX));
        group.rank();
    }

    /// Write sequence fields into the matching stops
    ///
    /// Stops not part of the allocation are left untouched.
    pub fn apply_to(&self, stops: &mut [Stop]) {
        let by_id: HashMap<&str, &SequencedStop> = self
            .drivers
            .iter()
            .chain(std::iter::once(&self.unassigned))
            .flat_map(|g| g.stops.iter())
            .map(|s| (s.stop_id.as_str(), s))
            .collect();

        for stop in stops.iter_mut() {
            if let Some(seq) = by_id.get(stop.id.as_str()) {
                stop.sequence.delivery_sequence = Some(seq.delivery_sequence);
                stop.sequence.packing_sequence = Some(seq.packing_sequence);
                stop.sequence.driver_delivery_sequence = seq.driver_delivery_sequence;
                stop.sequence.driver_packing_sequence = seq.driver_packing_sequence;
            }
        }
    }

    /// Per-driver groups in delivery order; unassigned last when non-empty
    pub fn delivery_groups(&self) -> Vec<DriverSequenceResult> {
        let mut groups = self.drivers.clone();
        if !self.unassigned.is_empty() {
            groups.push(self.unassigned.clone());
        }
        groups
    }

    /// Per-driver groups in pack order (`driver_packing_sequence` ascending;
    /// unassigned by global `packing_sequence`)
    pub fn packing_groups(&self) -> Vec<DriverSequenceResult> {
        let mut groups: Vec<DriverSequenceResult> =
            self.drivers.iter().map(DriverSequenceResult::reversed).collect();
        if !self.unassigned.is_empty() {
            groups.push(self.unassigned.reversed());
        }
        groups
    }
}
