//! Delivery route sequencing
//!
//! - [`sequencer`]: nearest neighbour + bounded 2-opt visiting order
//! - [`allocator`]: driver-contiguous sequences from the global route
//! - [`gate`]: fingerprint-based staleness check
//! - [`planner`]: per-date orchestration and persistence
//! - [`storage`]: redb tables for snapshots and plans

pub mod allocator;
pub mod gate;
pub mod geo;
pub mod planner;
pub mod router;
pub mod sequencer;
pub mod storage;

pub use allocator::{Allocation, DriverSequenceResult, SequencedStop, allocate};
pub use gate::{RecalculationGate, Staleness, evaluate_fingerprint};
pub use planner::{DeliveryPlanner, PlanOutcome, delivery_inputs};
pub use router::{GeoRouter, GeoRouterError, StraightLineRouter};
pub use sequencer::{RouteSequencer, SequencedOrder, assign_global_sequence, order_stops};
pub use storage::{DeliveryPlan, RouteStorage, StorageError};

use shared::delivery::LatLon;
use thiserror::Error;

/// Routing errors
///
/// GeoRouter failures and unlocatable stops are not errors: they degrade the
/// snapshot instead.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Invalid depot location: {0:?}")]
    InvalidDepot(LatLon),

    #[error("Route storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
