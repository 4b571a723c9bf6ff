//! Delivery sequencing types
//!
//! - Stops: one deliverable order location for a given day
//! - Route snapshots: persisted result of one sequencing run, scoped to
//!   `(delivery_date, route_type, driver_id)`
//! - Fingerprints: cheap summaries used to detect stale snapshots

pub mod fingerprint;
pub mod route;
pub mod stop;

// Re-exports
pub use fingerprint::{PlanFingerprint, RouteFingerprint, assignment_hash, stop_set_hash};
pub use route::{ParseRouteTypeError, RoutePath, RouteSnapshot, RouteType, SnapshotKey};
pub use stop::{DeliverySequenceFields, DriverId, LatLon, Stop, StopId, StopStatus};
