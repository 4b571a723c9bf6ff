//! Packing session - computed state from the packing event stream
//!
//! The session includes a `state_checksum` field for drift detection, and a
//! `version` that increments with every applied event. Order-level commands
//! may carry the version they were issued against; a mismatch is reported as
//! a concurrency conflict instead of being applied to newer state.

use super::types::StockMovement;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Packing status (mirrors the order's top-level status)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackingStatus {
    #[default]
    Confirmed,
    Packing,
    ReadyForDelivery,
}

impl std::fmt::Display for PackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackingStatus::Confirmed => write!(f, "CONFIRMED"),
            PackingStatus::Packing => write!(f, "PACKING"),
            PackingStatus::ReadyForDelivery => write!(f, "READY_FOR_DELIVERY"),
        }
    }
}

/// One line of the order being packed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackingItem {
    pub item_id: String,
    /// Stock key
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
    #[serde(default)]
    pub packed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packed_at: Option<i64>,
}

/// Packing sub-document of one order for one packing day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackingSession {
    pub order_id: String,
    pub delivery_date: NaiveDate,
    pub status: PackingStatus,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_packed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_packed_at: Option<i64>,
    pub items: Vec<PackingItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Stock consumed when the order was marked ready (restored on reset)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumed_stock: Vec<StockMovement>,
    /// Optimistic concurrency token, +1 per applied event
    pub version: u64,
    /// Last applied event sequence
    pub last_sequence: u64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub state_checksum: String,
}

impl PackingSession {
    /// Create a session in `Confirmed` state
    pub fn new(order_id: String, delivery_date: NaiveDate, items: Vec<PackingItem>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let mut session = Self {
            order_id,
            delivery_date,
            status: PackingStatus::Confirmed,
            is_paused: false,
            paused_by: None,
            paused_at: None,
            pause_reason: None,
            last_packed_by: None,
            last_packed_at: None,
            items,
            notes: None,
            consumed_stock: Vec::new(),
            version: 0,
            last_sequence: 0,
            created_at: now,
            updated_at: now,
            state_checksum: String::new(),
        };
        session.update_checksum();
        session
    }

    pub fn packed_count(&self) -> usize {
        self.items.iter().filter(|i| i.packed).count()
    }

    /// Derived: every item packed (false for an empty order)
    pub fn all_items_packed(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.packed)
    }

    /// Packing and not paused: item-level mutations are allowed
    pub fn is_actively_packing(&self) -> bool {
        self.status == PackingStatus::Packing && !self.is_paused
    }

    pub fn find_item(&self, item_id: &str) -> Option<&PackingItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    pub fn find_item_mut(&mut self, item_id: &str) -> Option<&mut PackingItem> {
        self.items.iter_mut().find(|i| i.item_id == item_id)
    }

    pub fn clear_pause(&mut self) {
        self.is_paused = false;
        self.paused_by = None;
        self.paused_at = None;
        self.pause_reason = None;
    }

    /// Compute state checksum for drift detection
    ///
    /// Fields included: item count, packed bitmap, quantities, status,
    /// pause flag, version. Returns a 16-character hex string.
    pub fn compute_checksum(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::Hasher as _;

        let mut hasher = DefaultHasher::new();
        self.items.len().hash(&mut hasher);
        for item in &self.items {
            item.item_id.hash(&mut hasher);
            item.quantity.hash(&mut hasher);
            item.packed.hash(&mut hasher);
        }
        self.status.hash(&mut hasher);
        self.is_paused.hash(&mut hasher);
        self.version.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    pub fn update_checksum(&mut self) {
        self.state_checksum = self.compute_checksum();
    }

    pub fn verify_checksum(&self) -> bool {
        self.state_checksum == self.compute_checksum()
    }
}
