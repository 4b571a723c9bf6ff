//! DeliveryPlanner - orchestrates sequencing, allocation and persistence per date
//!
//! # Flow
//!
//! ```text
//! plan_deliveries(date, stops)
//!     ├─ 1. Lock the date (one planning run per date at a time)
//!     ├─ 2. Gate: fresh plan stored? -> reuse, write fields back, done
//!     ├─ 3. RouteSequencer over ready-for-delivery stops (global)
//!     ├─ 4. Allocator splits by driver (optionally re-optimized per driver)
//!     ├─ 5. One write txn: replace delivery snapshots + plan fingerprint
//!     └─ 6. Write sequence fields back into the caller's stops
//! ```

use super::allocator::{Allocation, allocate};
use super::gate::{RecalculationGate, Staleness};
use super::router::StraightLineRouter;
use super::sequencer::RouteSequencer;
use super::storage::{DeliveryPlan, RouteStorage, StorageError};
use super::{RoutingError, RoutingResult};
use crate::core::Config;
use chrono::NaiveDate;
use parking_lot::Mutex;
use shared::delivery::{
    DriverId, LatLon, PlanFingerprint, RouteSnapshot, RouteType, SnapshotKey, Stop, StopId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Result of one `plan_deliveries` call
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Gate verdict before planning
    pub staleness: Staleness,
    /// `false` when the stored plan was reused
    pub recomputed: bool,
    pub allocation: Allocation,
    /// Driver-less delivery snapshot, present while no stop has a driver
    pub global: Option<RouteSnapshot>,
    /// One snapshot per driver, in first-seen order
    pub driver_routes: Vec<RouteSnapshot>,
    /// Ready stops left out for lack of coordinates
    pub unlocatable: Vec<StopId>,
}

/// Ready-for-delivery stop ids and their driver assignment
pub fn delivery_inputs(stops: &[Stop]) -> (HashSet<StopId>, HashMap<StopId, DriverId>) {
    let mut ready = HashSet::new();
    let mut assignment = HashMap::new();
    for stop in stops.iter().filter(|s| RouteType::Delivery.includes(s.status)) {
        ready.insert(stop.id.clone());
        if let Some(driver_id) = &stop.driver_id {
            assignment.insert(stop.id.clone(), driver_id.clone());
        }
    }
    (ready, assignment)
}

pub struct DeliveryPlanner {
    sequencer: RouteSequencer,
    storage: RouteStorage,
    gate: RecalculationGate,
    depot: LatLon,
    date_locks: Mutex<HashMap<NaiveDate, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeliveryPlanner {
    pub fn new(sequencer: RouteSequencer, storage: RouteStorage, depot: LatLon) -> Self {
        Self {
            sequencer,
            gate: RecalculationGate::new(storage.clone()),
            storage,
            depot,
            date_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Planner with the straight-line router over `<data_dir>/routes.redb`
    pub fn from_config(config: &Config) -> RoutingResult<Self> {
        if !config.depot.is_valid() {
            return Err(RoutingError::InvalidDepot(config.depot));
        }
        std::fs::create_dir_all(&config.data_dir)?;
        let storage = RouteStorage::open(config.routes_db_path())?;
        let router = Arc::new(StraightLineRouter::new(config.sequencer.average_speed_kmh));
        let sequencer = RouteSequencer::new(router, config.sequencer.clone());
        Ok(Self::new(sequencer, storage, config.depot))
    }

    pub fn storage(&self) -> &RouteStorage {
        &self.storage
    }

    pub fn gate(&self) -> &RecalculationGate {
        &self.gate
    }

    fn date_lock(&self, delivery_date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        self.date_locks
            .lock()
            .entry(delivery_date)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop the date's lock entry once no other run holds or awaits it
    fn release_date_lock(&self, delivery_date: NaiveDate, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.date_locks.lock();
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&delivery_date);
        }
    }

    fn check_depot(&self) -> RoutingResult<()> {
        if self.depot.is_valid() {
            Ok(())
        } else {
            Err(RoutingError::InvalidDepot(self.depot))
        }
    }

    /// Sequence the packing route for a date and write global fields back
    ///
    /// Participants are confirmed, packing and ready stops. Other stops are
    /// left untouched. Replaces the date's packing snapshot.
    pub async fn prepare_packing_route(
        &self,
        delivery_date: NaiveDate,
        stops: &mut [Stop],
    ) -> RoutingResult<RouteSnapshot> {
        self.check_depot()?;
        let lock = self.date_lock(delivery_date);
        let result = {
            let _guard = lock.lock().await;
            self.packing_route_locked(delivery_date, stops).await
        };
        self.release_date_lock(delivery_date, lock);
        result
    }

    async fn packing_route_locked(
        &self,
        delivery_date: NaiveDate,
        stops: &mut [Stop],
    ) -> RoutingResult<RouteSnapshot> {
        let mut candidates: Vec<Stop> = stops
            .iter()
            .filter(|s| RouteType::Packing.includes(s.status))
            .cloned()
            .collect();

        let snapshot = self
            .sequencer
            .compute_route(delivery_date, RouteType::Packing, &mut candidates, self.depot)
            .await;

        let txn = self.storage.begin_write()?;
        self.storage
            .remove_snapshots(&txn, delivery_date, RouteType::Packing)?;
        self.storage.store_snapshot(&txn, &snapshot)?;
        txn.commit().map_err(StorageError::from)?;

        copy_global_fields(&candidates, stops);

        tracing::info!(
            %delivery_date,
            stops = snapshot.len(),
            unlocatable = snapshot.unlocatable.len(),
            "Packing route prepared"
        );
        Ok(snapshot)
    }

    /// Whether the stored delivery plan for a date no longer matches `stops`
    pub fn needs_recalculation(
        &self,
        delivery_date: NaiveDate,
        stops: &[Stop],
    ) -> RoutingResult<bool> {
        let (ready, assignment) = delivery_inputs(stops);
        Ok(self
            .gate
            .needs_recalculation(delivery_date, &ready, &assignment)?)
    }

    /// Compute (or reuse) the delivery plan for a date
    ///
    /// Ready-for-delivery stops receive global and driver sequence fields;
    /// unlocatable ready stops get them cleared. The driver-less delivery
    /// snapshot is persisted only while no stop has a driver; once drivers
    /// are assigned the date holds one snapshot per driver and the global
    /// order lives in the stored allocation. With no ready stops left the
    /// date's delivery plan and snapshots are cleared.
    pub async fn plan_deliveries(
        &self,
        delivery_date: NaiveDate,
        stops: &mut [Stop],
    ) -> RoutingResult<PlanOutcome> {
        self.check_depot()?;
        let lock = self.date_lock(delivery_date);
        let result = {
            let _guard = lock.lock().await;
            self.plan_deliveries_locked(delivery_date, stops).await
        };
        self.release_date_lock(delivery_date, lock);
        result
    }

    async fn plan_deliveries_locked(
        &self,
        delivery_date: NaiveDate,
        stops: &mut [Stop],
    ) -> RoutingResult<PlanOutcome> {
        let (ready, assignment) = delivery_inputs(stops);
        let staleness = self.gate.evaluate(delivery_date, &ready, &assignment)?;

        if ready.is_empty() {
            return self.clear_delivery_plan(delivery_date, staleness);
        }

        if !staleness.is_stale()
            && let Some(plan) = self.storage.get_plan(delivery_date)?
        {
            tracing::debug!(%delivery_date, "Delivery plan fresh, reusing stored allocation");
            plan.allocation.apply_to(stops);
            let mut global = None;
            let mut by_driver: HashMap<DriverId, RouteSnapshot> = HashMap::new();
            for snapshot in self
                .storage
                .get_snapshots(delivery_date, RouteType::Delivery)?
            {
                match snapshot.key.driver_id.clone() {
                    Some(driver_id) => {
                        by_driver.insert(driver_id, snapshot);
                    }
                    None => global = Some(snapshot),
                }
            }
            let driver_routes = plan
                .allocation
                .driver_order()
                .into_iter()
                .filter_map(|d| by_driver.remove(d))
                .collect();
            return Ok(PlanOutcome {
                staleness,
                recomputed: false,
                allocation: plan.allocation,
                global,
                driver_routes,
                unlocatable: plan.unlocatable,
            });
        }

        let mut candidates: Vec<Stop> = stops
            .iter()
            .filter(|s| RouteType::Delivery.includes(s.status))
            .cloned()
            .collect();

        let global = self
            .sequencer
            .compute_route(delivery_date, RouteType::Delivery, &mut candidates, self.depot)
            .await;
        let mut allocation = allocate(&global, &assignment);

        let located: HashMap<&str, LatLon> = candidates
            .iter()
            .filter_map(|s| s.location().map(|loc| (s.id.as_str(), loc)))
            .collect();

        let mut driver_routes = Vec::with_capacity(allocation.drivers.len());
        let reoptimize = self.sequencer.config().reoptimize_per_driver;
        let driver_ids: Vec<DriverId> = allocation
            .driver_order()
            .into_iter()
            .map(str::to_string)
            .collect();

        for driver_id in &driver_ids {
            let Some(group) = allocation.driver(driver_id) else {
                continue;
            };
            let snapshot = if reoptimize {
                let ids: HashSet<&str> = group.stops.iter().map(|s| s.stop_id.as_str()).collect();
                let driver_stops: Vec<Stop> = candidates
                    .iter()
                    .filter(|s| ids.contains(s.id.as_str()))
                    .cloned()
                    .collect();
                let snapshot = self
                    .sequencer
                    .compute_driver_route(delivery_date, driver_id, &driver_stops, self.depot)
                    .await;
                allocation.reorder_driver(driver_id, &snapshot.stop_ids);
                snapshot
            } else {
                let ordered: Vec<(StopId, LatLon)> = group
                    .stops
                    .iter()
                    .filter_map(|s| {
                        located
                            .get(s.stop_id.as_str())
                            .map(|loc| (s.stop_id.clone(), *loc))
                    })
                    .collect();
                self.sequencer
                    .trace_route(
                        SnapshotKey::for_driver(delivery_date, driver_id.as_str()),
                        ordered,
                        self.depot,
                    )
                    .await
            };
            driver_routes.push(snapshot);
        }

        let unlocatable = global.unlocatable.clone();
        let plan = DeliveryPlan {
            delivery_date,
            fingerprint: PlanFingerprint::compute(&ready, &assignment),
            allocation: allocation.clone(),
            unlocatable: unlocatable.clone(),
            computed_at: shared::util::now_millis(),
        };
        let global = driver_routes.is_empty().then_some(global);

        let txn = self.storage.begin_write()?;
        let replaced = self
            .storage
            .remove_snapshots(&txn, delivery_date, RouteType::Delivery)?;
        if let Some(global) = &global {
            self.storage.store_snapshot(&txn, global)?;
        }
        for snapshot in &driver_routes {
            self.storage.store_snapshot(&txn, snapshot)?;
        }
        self.storage.store_plan(&txn, &plan)?;
        txn.commit().map_err(StorageError::from)?;

        // Unlocatable ready stops were cleared on the candidates; allocation
        // only covers located ones
        copy_global_fields(&candidates, stops);
        allocation.apply_to(stops);

        tracing::info!(
            %delivery_date,
            ?staleness,
            stops = allocation.stop_count(),
            drivers = driver_routes.len(),
            unassigned = allocation.unassigned.len(),
            unlocatable = unlocatable.len(),
            replaced,
            "Delivery plan recomputed"
        );

        Ok(PlanOutcome {
            staleness,
            recomputed: true,
            allocation,
            global,
            driver_routes,
            unlocatable,
        })
    }

    /// Remove the date's delivery plan and snapshots
    fn clear_delivery_plan(
        &self,
        delivery_date: NaiveDate,
        staleness: Staleness,
    ) -> RoutingResult<PlanOutcome> {
        let txn = self.storage.begin_write()?;
        let removed = self
            .storage
            .remove_snapshots(&txn, delivery_date, RouteType::Delivery)?;
        self.storage.remove_plan(&txn, delivery_date)?;
        txn.commit().map_err(StorageError::from)?;

        if removed > 0 {
            tracing::info!(%delivery_date, removed, "No ready stops, delivery plan cleared");
        }

        let empty =
            RouteSnapshot::empty(SnapshotKey::global(delivery_date, RouteType::Delivery), vec![]);
        Ok(PlanOutcome {
            staleness,
            recomputed: false,
            allocation: allocate(&empty, &HashMap::new()),
            global: None,
            driver_routes: vec![],
            unlocatable: vec![],
        })
    }

    pub fn delivery_plan(&self, delivery_date: NaiveDate) -> RoutingResult<Option<DeliveryPlan>> {
        Ok(self.storage.get_plan(delivery_date)?)
    }

    pub fn route_snapshots(
        &self,
        delivery_date: NaiveDate,
        route_type: RouteType,
    ) -> RoutingResult<Vec<RouteSnapshot>> {
        Ok(self.storage.get_snapshots(delivery_date, route_type)?)
    }
}

/// Copy sequence fields of `from` into the stops of `to` with the same id
fn copy_global_fields(from: &[Stop], to: &mut [Stop]) {
    let by_id: HashMap<&str, &Stop> = from.iter().map(|s| (s.id.as_str(), s)).collect();
    for stop in to.iter_mut() {
        if let Some(source) = by_id.get(stop.id.as_str()) {
            stop.sequence = source.sequence.clone();
        }
    }
}
