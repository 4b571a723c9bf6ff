//! Packing events - immutable facts recorded after command processing

use super::session::{PackingItem, PackingStatus};
use super::types::{StockMovement, StockWarning};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Packing event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number (for ordering and replay)
    pub sequence: u64,
    /// Order this event belongs to
    pub order_id: String,
    /// Server timestamp (Unix milliseconds) - authoritative
    pub timestamp: i64,
    /// Client timestamp (Unix milliseconds) - for audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Operator who triggered this event
    pub operator_id: String,
    /// Operator name (snapshot for audit)
    pub operator_name: String,
    /// Command that triggered this event
    pub command_id: String,
    pub event_type: PackingEventType,
    pub payload: PackingEventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackingEventType {
    // Lifecycle
    SessionOpened,
    PackingStarted,
    OrderMarkedReady,
    OrderReset,

    // Pause
    OrderPaused,
    OrderResumed,

    // Items
    ItemPackToggled,
    ItemQuantityUpdated,
}

impl std::fmt::Display for PackingEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackingEventType::SessionOpened => write!(f, "SESSION_OPENED"),
            PackingEventType::PackingStarted => write!(f, "PACKING_STARTED"),
            PackingEventType::OrderMarkedReady => write!(f, "ORDER_MARKED_READY"),
            PackingEventType::OrderReset => write!(f, "ORDER_RESET"),
            PackingEventType::OrderPaused => write!(f, "ORDER_PAUSED"),
            PackingEventType::OrderResumed => write!(f, "ORDER_RESUMED"),
            PackingEventType::ItemPackToggled => write!(f, "ITEM_PACK_TOGGLED"),
            PackingEventType::ItemQuantityUpdated => write!(f, "ITEM_QUANTITY_UPDATED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackingEventPayload {
    // ========== Lifecycle ==========
    SessionOpened {
        delivery_date: NaiveDate,
        items: Vec<PackingItem>,
    },

    PackingStarted {},

    OrderMarkedReady {
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        /// Stock decremented, aggregated per product
        consumed: Vec<StockMovement>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<StockWarning>,
    },

    OrderReset {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        previous_status: PackingStatus,
        new_status: PackingStatus,
        /// Stock given back (only when resetting a ready order)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        restored: Vec<StockMovement>,
    },

    // ========== Pause ==========
    OrderPaused {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    OrderResumed {},

    // ========== Items ==========
    ItemPackToggled {
        item_id: String,
        item_name: String,
        packed: bool,
    },

    ItemQuantityUpdated {
        item_id: String,
        item_name: String,
        previous_quantity: i32,
        new_quantity: i32,
        /// Whether a PIN was required and verified for this edit
        pin_verified: bool,
    },
}

impl PackingEvent {
    /// Create a new event
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        order_id: String,
        operator_id: String,
        operator_name: String,
        command_id: String,
        client_timestamp: Option<i64>,
        event_type: PackingEventType,
        payload: PackingEventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            order_id,
            // Server timestamp is always set by the engine
            timestamp: chrono::Utc::now().timestamp_millis(),
            client_timestamp,
            operator_id,
            operator_name,
            command_id,
            event_type,
            payload,
        }
    }
}
