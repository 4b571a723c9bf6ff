//! Packing commands - requests from packers

use super::types::PackingItemInput;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Packing command envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingCommand {
    /// Client-generated id (idempotency key)
    pub command_id: String,
    pub operator_id: String,
    pub operator_name: String,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Session version the client observed; checked for order-level transitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
    pub payload: PackingCommandPayload,
}

impl PackingCommand {
    pub fn new(
        operator_id: impl Into<String>,
        operator_name: impl Into<String>,
        payload: PackingCommandPayload,
    ) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            operator_id: operator_id.into(),
            operator_name: operator_name.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            expected_version: None,
            payload,
        }
    }

    pub fn with_expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Command payload variants
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackingCommandPayload {
    /// Register an order's packing sub-document (status CONFIRMED)
    OpenSession {
        order_id: String,
        delivery_date: NaiveDate,
        items: Vec<PackingItemInput>,
    },
    /// CONFIRMED -> PACKING
    StartPacking { order_id: String },
    MarkItemPacked {
        order_id: String,
        item_id: String,
        packed: bool,
    },
    MarkOrderReady {
        order_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    PauseOrder {
        order_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    ResumeOrder { order_id: String },
    ResetOrder {
        order_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    UpdateItemQuantity {
        order_id: String,
        item_id: String,
        new_quantity: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        pin: Option<String>,
    },
}

impl PackingCommandPayload {
    pub fn order_id(&self) -> &str {
        match self {
            PackingCommandPayload::OpenSession { order_id, .. }
            | PackingCommandPayload::StartPacking { order_id }
            | PackingCommandPayload::MarkItemPacked { order_id, .. }
            | PackingCommandPayload::MarkOrderReady { order_id, .. }
            | PackingCommandPayload::PauseOrder { order_id, .. }
            | PackingCommandPayload::ResumeOrder { order_id }
            | PackingCommandPayload::ResetOrder { order_id, .. }
            | PackingCommandPayload::UpdateItemQuantity { order_id, .. } => order_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PackingCommandPayload::OpenSession { .. } => "OPEN_SESSION",
            PackingCommandPayload::StartPacking { .. } => "START_PACKING",
            PackingCommandPayload::MarkItemPacked { .. } => "MARK_ITEM_PACKED",
            PackingCommandPayload::MarkOrderReady { .. } => "MARK_ORDER_READY",
            PackingCommandPayload::PauseOrder { .. } => "PAUSE_ORDER",
            PackingCommandPayload::ResumeOrder { .. } => "RESUME_ORDER",
            PackingCommandPayload::ResetOrder { .. } => "RESET_ORDER",
            PackingCommandPayload::UpdateItemQuantity { .. } => "UPDATE_ITEM_QUANTITY",
        }
    }

    /// Item-level flag flips are last-write-wins and skip the version check
    pub fn is_item_level(&self) -> bool {
        matches!(self, PackingCommandPayload::MarkItemPacked { .. })
    }
}

// PIN never reaches logs
impl std::fmt::Debug for PackingCommandPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackingCommandPayload::UpdateItemQuantity {
                order_id,
                item_id,
                new_quantity,
                pin,
            } => f
                .debug_struct("UpdateItemQuantity")
                .field("order_id", order_id)
                .field("item_id", item_id)
                .field("new_quantity", new_quantity)
                .field("pin", &pin.as_ref().map(|_| "***"))
                .finish(),
            other => f
                .debug_struct(other.kind())
                .field("order_id", &other.order_id())
                .finish_non_exhaustive(),
        }
    }
}
