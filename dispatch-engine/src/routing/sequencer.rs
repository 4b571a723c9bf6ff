//! RouteSequencer - best-effort visiting order for a set of stops
//!
//! # Algorithm
//!
//! ```text
//! located stops (sorted by order_id, id)
//!     ├─ 1. Nearest neighbour from the depot (ties -> lower order_id)
//!     ├─ 2. Bounded 2-opt over the open path depot -> ... -> last stop
//!     └─ 3. GeoRouter for geometry/distance/duration of the final order
//! ```
//!
//! The result approximates a short path; it is not an exact TSP solution.
//! Identical inputs (same ids, same coordinates) always produce the same
//! order, regardless of input ordering.

use super::geo::{haversine_m, path_length_m};
use super::router::GeoRouter;
use crate::core::SequencerConfig;
use chrono::NaiveDate;
use shared::delivery::{
    LatLon, RouteFingerprint, RouteSnapshot, RouteType, SnapshotKey, Stop, StopId,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Distances closer than this are treated as equal (tie-break applies)
const TIE_EPSILON_M: f64 = 1e-9;

/// Minimum gain for a 2-opt move to be taken
const IMPROVEMENT_EPSILON_M: f64 = 1e-6;

/// Visiting order produced before any GeoRouter involvement
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedOrder {
    pub stop_ids: Vec<StopId>,
    pub points: Vec<LatLon>,
    pub unlocatable: Vec<StopId>,
    /// Great-circle length of depot -> stops
    pub estimated_distance_m: f64,
}

/// Order stops: nearest neighbour + bounded 2-opt
///
/// Stops without valid coordinates are excluded and listed in `unlocatable`.
pub fn order_stops(stops: &[Stop], depot: LatLon, max_two_opt_passes: usize) -> SequencedOrder {
    let mut unlocatable = Vec::new();
    let mut located: Vec<(&Stop, LatLon)> = Vec::with_capacity(stops.len());
    for stop in stops {
        match stop.location() {
            Some(loc) => located.push((stop, loc)),
            None => unlocatable.push(stop.id.clone()),
        }
    }

    // Canonical candidate order makes the tie-break (and the whole result)
    // independent of input ordering
    located.sort_by(|a, b| {
        a.0.order_id
            .cmp(&b.0.order_id)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });

    let mut tour = nearest_neighbour(&located, depot);
    two_opt(&mut tour, &located, depot, max_two_opt_passes);

    let stop_ids: Vec<StopId> = tour.iter().map(|&i| located[i].0.id.clone()).collect();
    let points: Vec<LatLon> = tour.iter().map(|&i| located[i].1).collect();

    let mut full_path = Vec::with_capacity(points.len() + 1);
    full_path.push(depot);
    full_path.extend_from_slice(&points);

    SequencedOrder {
        stop_ids,
        points,
        unlocatable,
        estimated_distance_m: path_length_m(&full_path),
    }
}

/// Indices into `located`, in visiting order
fn nearest_neighbour(located: &[(&Stop, LatLon)], depot: LatLon) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..located.len()).collect();
    let mut tour = Vec::with_capacity(located.len());
    let mut current = depot;

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_distance = haversine_m(current, located[remaining[0]].1);
        for (pos, &idx) in remaining.iter().enumerate().skip(1) {
            let d = haversine_m(current, located[idx].1);
            // Strictly closer only: equal distances keep the earlier (lower order_id) candidate
            if d < best_distance - TIE_EPSILON_M {
                best = pos;
                best_distance = d;
            }
        }
        let next = remaining.remove(best);
        current = located[next].1;
        tour.push(next);
    }

    tour
}

/// First-improvement 2-opt on an open path anchored at the depot
fn two_opt(tour: &mut [usize], located: &[(&Stop, LatLon)], depot: LatLon, max_passes: usize) {
    let n = tour.len();
    if n < 3 {
        return;
    }
    // point(k): k == 0 is the depot, k >= 1 is tour[k - 1]
    let point = |tour: &[usize], k: usize| -> LatLon {
        if k == 0 { depot } else { located[tour[k - 1]].1 }
    };

    for pass in 0..max_passes {
        let mut improved = false;
        for i in 1..n {
            for j in (i + 1)..=n {
                let before_i = point(tour, i - 1);
                let first = point(tour, i);
                let last = point(tour, j);

                let mut before = haversine_m(before_i, first);
                let mut after = haversine_m(before_i, last);
                if j < n {
                    let after_j = point(tour, j + 1);
                    before += haversine_m(last, after_j);
                    after += haversine_m(first, after_j);
                }

                if after + IMPROVEMENT_EPSILON_M < before {
                    tour[i - 1..j].reverse();
                    improved = true;
                }
            }
        }
        if !improved {
            tracing::trace!(passes = pass + 1, "2-opt converged");
            break;
        }
    }
}

/// Computes route snapshots; only decides the order, geometry comes from the GeoRouter
#[derive(Clone)]
pub struct RouteSequencer {
    router: Arc<dyn GeoRouter>,
    config: SequencerConfig,
}

impl std::fmt::Debug for RouteSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSequencer")
            .field("router", &"<dyn GeoRouter>")
            .field("config", &self.config)
            .finish()
    }
}

impl RouteSequencer {
    pub fn new(router: Arc<dyn GeoRouter>, config: SequencerConfig) -> Self {
        Self { router, config }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Compute the global route and write `delivery_sequence`/`packing_sequence`
    /// into every located stop
    ///
    /// Unlocatable stops get their sequence fields cleared and are listed in
    /// the snapshot. With no located stops the snapshot is empty.
    pub async fn compute_route(
        &self,
        delivery_date: NaiveDate,
        route_type: RouteType,
        stops: &mut [Stop],
        depot: LatLon,
    ) -> RouteSnapshot {
        let key = SnapshotKey::global(delivery_date, route_type);
        let snapshot = self.build_snapshot(key, stops, depot).await;
        assign_global_sequence(&snapshot, stops);
        snapshot
    }

    /// Optimized order restricted to one driver's stops
    ///
    /// Sequence fields are not touched; the caller decides how to rank.
    pub async fn compute_driver_route(
        &self,
        delivery_date: NaiveDate,
        driver_id: &str,
        stops: &[Stop],
        depot: LatLon,
    ) -> RouteSnapshot {
        let key = SnapshotKey::for_driver(delivery_date, driver_id);
        self.build_snapshot(key, stops, depot).await
    }

    /// Snapshot for an order fixed by the caller (geometry only, no re-ordering)
    pub async fn trace_route(
        &self,
        key: SnapshotKey,
        ordered: Vec<(StopId, LatLon)>,
        depot: LatLon,
    ) -> RouteSnapshot {
        let (stop_ids, points): (Vec<StopId>, Vec<LatLon>) = ordered.into_iter().unzip();
        let mut full_path = Vec::with_capacity(points.len() + 1);
        full_path.push(depot);
        full_path.extend_from_slice(&points);
        let order = SequencedOrder {
            stop_ids,
            points,
            unlocatable: Vec::new(),
            estimated_distance_m: path_length_m(&full_path),
        };
        self.finish_snapshot(key, order, depot).await
    }

    async fn build_snapshot(&self, key: SnapshotKey, stops: &[Stop], depot: LatLon) -> RouteSnapshot {
        let order = order_stops(stops, depot, self.config.max_two_opt_passes);
        if !order.unlocatable.is_empty() {
            tracing::warn!(
                route = %key.storage_key(),
                unlocatable = order.unlocatable.len(),
                stop_ids = ?order.unlocatable,
                "Stops without coordinates excluded from sequencing"
            );
        }
        self.finish_snapshot(key, order, depot).await
    }

    async fn finish_snapshot(
        &self,
        key: SnapshotKey,
        order: SequencedOrder,
        depot: LatLon,
    ) -> RouteSnapshot {
        if order.stop_ids.is_empty() {
            tracing::debug!(route = %key.storage_key(), "No locatable stops, empty route");
            return RouteSnapshot::empty(key, order.unlocatable);
        }

        let mut path_points = Vec::with_capacity(order.points.len() + 1);
        path_points.push(depot);
        path_points.extend_from_slice(&order.points);

        let (geometry, total_distance_m, total_duration_s) =
            match self.router.compute_path(&path_points).await {
                Ok(path) => (
                    Some(path.geometry),
                    Some(path.total_distance_m),
                    Some(path.total_duration_s),
                ),
                Err(e) => {
                    tracing::warn!(
                        route = %key.storage_key(),
                        error = %e,
                        "GeoRouter unavailable, keeping order without geometry"
                    );
                    (None, None, None)
                }
            };

        tracing::debug!(
            route = %key.storage_key(),
            stops = order.stop_ids.len(),
            estimated_m = order.estimated_distance_m,
            "Route computed"
        );

        RouteSnapshot {
            fingerprint: RouteFingerprint::of(order.stop_ids.iter().map(String::as_str)),
            key,
            stop_ids: order.stop_ids,
            geometry,
            total_distance_m,
            total_duration_s,
            estimated_distance_m: order.estimated_distance_m,
            unlocatable: order.unlocatable,
            computed_at: shared::util::now_millis(),
        }
    }
}

/// Write global `delivery_sequence` and LIFO `packing_sequence` from a snapshot
///
/// Stops absent from the snapshot lose all sequence fields.
pub fn assign_global_sequence(snapshot: &RouteSnapshot, stops: &mut [Stop]) {
    let n = snapshot.len() as u32;
    let positions: HashMap<&str, u32> = snapshot
        .stop_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx as u32 + 1))
        .collect();

    for stop in stops.iter_mut() {
        match positions.get(stop.id.as_str()) {
            Some(&rank) => {
                stop.sequence.delivery_sequence = Some(rank);
                stop.sequence.packing_sequence = Some(n - rank + 1);
            }
            None => stop.sequence.clear(),
        }
    }
}
