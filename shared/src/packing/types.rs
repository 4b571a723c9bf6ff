//! Shared types for packing event sourcing

use super::session::PackingSession;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Items
// ============================================================================

/// Item input when a packing session is opened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingItemInput {
    pub item_id: String,
    /// Stock key
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
}

// ============================================================================
// Stock
// ============================================================================

/// Stock on hand for one product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockLevel {
    pub quantity: i32,
    /// Expiry of the lot currently on hand
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

impl StockLevel {
    pub fn new(quantity: i32) -> Self {
        Self {
            quantity,
            expires_on: None,
        }
    }

    pub fn with_expiry(mut self, expires_on: NaiveDate) -> Self {
        self.expires_on = Some(expires_on);
        self
    }
}

/// One stock adjustment (decrement on ready, restore on reset)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockMovement {
    pub product_id: String,
    pub quantity: i32,
}

/// Non-fatal stock observation collected while marking an order ready
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockWarning {
    pub product_id: String,
    #[serde(flatten)]
    pub kind: StockWarningKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "warning", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockWarningKind {
    /// Remaining stock at or below the configured threshold
    LowStock { remaining: i32 },
    /// Lot already expired when packed
    Expired { expires_on: NaiveDate },
    /// Lot expires before the delivery date
    ExpiresBeforeDelivery {
        expires_on: NaiveDate,
        delivery_date: NaiveDate,
    },
}

// ============================================================================
// Command Response
// ============================================================================

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Session version after the command was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Non-fatal stock warnings (mark ready)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StockWarning>,
    /// Whether this command id had already been processed
    #[serde(default)]
    pub duplicate: bool,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, order_id: Option<String>) -> Self {
        Self {
            command_id,
            success: true,
            order_id,
            version: None,
            warnings: Vec::new(),
            duplicate: false,
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            order_id: None,
            version: None,
            warnings: Vec::new(),
            duplicate: false,
            error: Some(error),
        }
    }

    pub fn duplicate(command_id: String) -> Self {
        Self {
            duplicate: true,
            ..Self::success(command_id, None)
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<StockWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn error_code(&self) -> Option<&CommandErrorCode> {
        self.error.as_ref().map(|e| &e.code)
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
    /// Current session state, attached to guard failures and conflicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Box<PackingSession>>,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            current: None,
        }
    }

    pub fn with_current(mut self, current: Option<Box<PackingSession>>) -> Self {
        self.current = current;
        self
    }
}

/// Command error codes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    SessionNotFound,
    SessionAlreadyExists,
    ItemNotFound,
    /// Guard failed: the order is not in the expected state
    StaleInput,
    InsufficientStock,
    /// Wrong or missing PIN; callers may offer a bounded retry
    InvalidPin,
    InvalidQuantity,
    /// Optimistic version check failed; refetch and retry
    ConcurrencyConflict,
    InvalidOperation,
    DuplicateCommand,
    InternalError,
    // Storage errors
    StorageFull,
    OutOfMemory,
    StorageCorrupted,
    SystemBusy,
}

impl CommandErrorCode {
    /// Whether the caller should refetch state and may retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommandErrorCode::ConcurrencyConflict | CommandErrorCode::SystemBusy
        )
    }
}
