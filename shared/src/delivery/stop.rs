//! Delivery stops and their embedded sequence fields

use serde::{Deserialize, Serialize};

pub type StopId = String;
pub type DriverId = String;

/// Order status as seen by the sequencing subsystem
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopStatus {
    Confirmed,
    Packing,
    ReadyForDelivery,
    OutForDelivery,
    Delivered,
}

impl StopStatus {
    /// Participates in the delivery-type route
    pub fn is_delivery_candidate(self) -> bool {
        matches!(self, StopStatus::ReadyForDelivery)
    }

    /// Participates in the packing-type route (computed at packing-session start)
    pub fn is_packing_candidate(self) -> bool {
        matches!(
            self,
            StopStatus::Confirmed | StopStatus::Packing | StopStatus::ReadyForDelivery
        )
    }
}

/// A geographic point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside the WGS84 range
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Sequence fields embedded in each order record
///
/// For a fixed driver, `driver_packing_sequence` is the exact reverse rank of
/// `driver_delivery_sequence`: the stop delivered last is packed first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliverySequenceFields {
    /// Global position (1-based)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_sequence: Option<u32>,
    /// Position within the assigned driver's stops (1-based)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_delivery_sequence: Option<u32>,
    /// Global LIFO pack order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packing_sequence: Option<u32>,
    /// LIFO pack order within the assigned driver's stops
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_packing_sequence: Option<u32>,
}

impl DeliverySequenceFields {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn clear_driver(&mut self) {
        self.driver_delivery_sequence = None;
        self.driver_packing_sequence = None;
    }
}

/// One delivery for a given day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub order_id: String,
    /// Missing until the order has been geocoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Coarse geographic bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<DriverId>,
    pub status: StopStatus,
    #[serde(flatten)]
    pub sequence: DeliverySequenceFields,
}

impl Stop {
    pub fn new(id: impl Into<String>, order_id: impl Into<String>, status: StopStatus) -> Self {
        Self {
            id: id.into(),
            order_id: order_id.into(),
            latitude: None,
            longitude: None,
            area_tag: None,
            driver_id: None,
            status,
            sequence: DeliverySequenceFields::default(),
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_driver(mut self, driver_id: impl Into<String>) -> Self {
        self.driver_id = Some(driver_id.into());
        self
    }

    pub fn with_area(mut self, area_tag: impl Into<String>) -> Self {
        self.area_tag = Some(area_tag.into());
        self
    }

    /// Location usable for sequencing, `None` for unlocatable stops
    pub fn location(&self) -> Option<LatLon> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(LatLon::new(lat, lon)).filter(LatLon::is_valid),
            _ => None,
        }
    }
}
