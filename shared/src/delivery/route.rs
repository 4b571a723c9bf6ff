//! Route snapshots - persisted results of sequencing runs

use super::fingerprint::RouteFingerprint;
use super::stop::{DriverId, LatLon, StopId, StopStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Which consumer a route was computed for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteType {
    /// Computed at packing-session start over confirmed/packing/ready stops
    Packing,
    /// Computed over ready-for-delivery stops, per driver once assigned
    Delivery,
}

impl RouteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Packing => "PACKING",
            RouteType::Delivery => "DELIVERY",
        }
    }

    /// Whether a stop with `status` participates in this route type
    pub fn includes(&self, status: StopStatus) -> bool {
        match self {
            RouteType::Packing => status.is_packing_candidate(),
            RouteType::Delivery => status.is_delivery_candidate(),
        }
    }
}

impl std::fmt::Display for RouteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown route type: {0}")]
pub struct ParseRouteTypeError(pub String);

impl FromStr for RouteType {
    type Err = ParseRouteTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PACKING" => Ok(RouteType::Packing),
            "DELIVERY" => Ok(RouteType::Delivery),
            _ => Err(ParseRouteTypeError(s.to_string())),
        }
    }
}

/// Snapshot identity: `(delivery_date, route_type, driver_id | null)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub delivery_date: NaiveDate,
    pub route_type: RouteType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<DriverId>,
}

impl SnapshotKey {
    /// Global (driver-less) snapshot key
    pub fn global(delivery_date: NaiveDate, route_type: RouteType) -> Self {
        Self {
            delivery_date,
            route_type,
            driver_id: None,
        }
    }

    /// Per-driver delivery snapshot key
    pub fn for_driver(delivery_date: NaiveDate, driver_id: impl Into<String>) -> Self {
        Self {
            delivery_date,
            route_type: RouteType::Delivery,
            driver_id: Some(driver_id.into()),
        }
    }

    /// `YYYY-MM-DD|TYPE|G` for the global snapshot, `YYYY-MM-DD|TYPE|D:<driver>`
    /// per driver. The tags keep any driver id apart from the global key.
    pub fn storage_key(&self) -> String {
        let prefix = Self::type_prefix(self.delivery_date, self.route_type);
        match &self.driver_id {
            Some(driver_id) => format!("{prefix}D:{driver_id}"),
            None => format!("{prefix}G"),
        }
    }

    /// Prefix shared by every snapshot of one date and route type
    pub fn type_prefix(delivery_date: NaiveDate, route_type: RouteType) -> String {
        format!("{}|{}|", crate::util::date_key(delivery_date), route_type)
    }
}

/// GeoRouter output for an ordered list of points
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutePath {
    pub geometry: Vec<LatLon>,
    /// Meters
    pub total_distance_m: f64,
    /// Seconds
    pub total_duration_s: f64,
}

/// One persisted optimization result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteSnapshot {
    #[serde(flatten)]
    pub key: SnapshotKey,
    /// Visiting order (position + 1 = sequence)
    pub stop_ids: Vec<StopId>,
    /// Path polyline, `None` when the GeoRouter was unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<LatLon>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration_s: Option<f64>,
    /// Great-circle length of the chosen order, always present
    #[serde(default)]
    pub estimated_distance_m: f64,
    pub fingerprint: RouteFingerprint,
    /// Stops excluded for lack of coordinates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unlocatable: Vec<StopId>,
    pub computed_at: i64,
}

impl RouteSnapshot {
    /// Snapshot with no visiting order
    pub fn empty(key: SnapshotKey, unlocatable: Vec<StopId>) -> Self {
        Self {
            key,
            stop_ids: Vec::new(),
            geometry: None,
            total_distance_m: None,
            total_duration_s: None,
            estimated_distance_m: 0.0,
            fingerprint: RouteFingerprint::of(std::iter::empty::<&str>()),
            unlocatable,
            computed_at: crate::util::now_millis(),
        }
    }

    pub fn len(&self) -> usize {
        self.stop_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_ids.is_empty()
    }

    pub fn driver_id(&self) -> Option<&str> {
        self.key.driver_id.as_deref()
    }

    /// 1-based position of a stop in the visiting order
    pub fn position_of(&self, stop_id: &str) -> Option<u32> {
        self.stop_ids
            .iter()
            .position(|id| id == stop_id)
            .map(|idx| idx as u32 + 1)
    }

    pub fn has_geometry(&self) -> bool {
        self.geometry.is_some()
    }
}
