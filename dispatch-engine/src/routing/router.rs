//! GeoRouter - path geometry, distance and duration for an ordered stop list
//!
//! The router is an external collaborator. The sequencer only decides the
//! visiting order and tolerates an unavailable router.

use async_trait::async_trait;
use shared::delivery::{LatLon, RoutePath};
use thiserror::Error;

use super::geo::path_length_m;

#[derive(Debug, Error)]
pub enum GeoRouterError {
    #[error("GeoRouter unavailable: {0}")]
    Unavailable(String),
}

/// Computes a drivable path through already-ordered points
#[async_trait]
pub trait GeoRouter: Send + Sync {
    async fn compute_path(&self, ordered: &[LatLon]) -> Result<RoutePath, GeoRouterError>;
}

/// Straight-line router: great-circle legs at a constant average speed
///
/// Used when no road router is configured.
#[derive(Debug, Clone)]
pub struct StraightLineRouter {
    average_speed_kmh: f64,
}

impl StraightLineRouter {
    pub fn new(average_speed_kmh: f64) -> Self {
        Self { average_speed_kmh }
    }
}

impl Default for StraightLineRouter {
    fn default() -> Self {
        Self::new(30.0)
    }
}

#[async_trait]
impl GeoRouter for StraightLineRouter {
    async fn compute_path(&self, ordered: &[LatLon]) -> Result<RoutePath, GeoRouterError> {
        if self.average_speed_kmh <= 0.0 || !self.average_speed_kmh.is_finite() {
            return Err(GeoRouterError::Unavailable(format!(
                "invalid average speed: {}",
                self.average_speed_kmh
            )));
        }
        let total_distance_m = path_length_m(ordered);
        let speed_ms = self.average_speed_kmh * 1000.0 / 3600.0;
        Ok(RoutePath {
            geometry: ordered.to_vec(),
            total_distance_m,
            total_duration_s: total_distance_m / speed_ms,
        })
    }
}
