//! Core traits for the packing command/event pipeline
//!
//! - [`CommandHandler`]: validates a command against the current session and
//!   produces events
//! - [`EventApplier`]: folds one event into a session (pure)
//! - [`CommandContext`]: transaction-scoped view used by handlers

use super::storage::{PackingStorage, StorageError};
use redb::WriteTransaction;
use shared::packing::{PackingEvent, PackingSession, StockLevel};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by command handlers
#[derive(Debug, Error)]
pub enum PackingError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session already exists: {0}")]
    SessionAlreadyExists(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Guard failed: the order is no longer in the state the command expects
    #[error("{0}")]
    StaleInput(String),

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i32,
        available: i32,
    },

    #[error("Invalid PIN")]
    InvalidPin,

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for PackingError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SessionNotFound(id) => PackingError::SessionNotFound(id),
            other => PackingError::Storage(other.to_string()),
        }
    }
}

/// Who issued the command, and when
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub operator_id: String,
    pub operator_name: String,
    pub timestamp: i64,
}

/// Transaction-scoped state for one command
///
/// Sessions loaded or saved here are cached so later events of the same
/// command see earlier ones.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a PackingStorage,
    current_sequence: u64,
    sessions: HashMap<String, PackingSession>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a PackingStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            current_sequence,
            sessions: HashMap::new(),
        }
    }

    /// Allocate the next global event sequence
    pub fn next_sequence(&mut self) -> u64 {
        self.current_sequence += 1;
        self.current_sequence
    }

    pub fn current_sequence(&self) -> u64 {
        self.current_sequence
    }

    pub fn session_exists(&self, order_id: &str) -> Result<bool, PackingError> {
        if self.sessions.contains_key(order_id) {
            return Ok(true);
        }
        Ok(self.storage.get_session_txn(self.txn, order_id)?.is_some())
    }

    /// Load a session (cached value first, then the transaction)
    pub fn load_session(&self, order_id: &str) -> Result<PackingSession, PackingError> {
        if let Some(session) = self.sessions.get(order_id) {
            return Ok(session.clone());
        }
        self.storage
            .get_session_txn(self.txn, order_id)?
            .ok_or_else(|| PackingError::SessionNotFound(order_id.to_string()))
    }

    pub fn save_session(&mut self, session: PackingSession) {
        self.sessions.insert(session.order_id.clone(), session);
    }

    pub fn modified_sessions(&self) -> impl Iterator<Item = &PackingSession> {
        self.sessions.values()
    }

    /// Stock level as seen by this transaction
    pub fn load_stock(&self, product_id: &str) -> Result<Option<StockLevel>, PackingError> {
        Ok(self.storage.get_stock_txn(self.txn, product_id)?)
    }
}

/// Validates a command and produces the events it causes
pub trait CommandHandler {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<PackingEvent>, PackingError>;
}

/// Applies one event to a session
///
/// Implementations are pure: no I/O, no clock, no randomness. Replaying a
/// session's events from scratch reproduces the stored session.
#[enum_dispatch::enum_dispatch]
pub trait EventApplier {
    fn apply(&self, session: &mut PackingSession, event: &PackingEvent);
}

/// Bookkeeping shared by every applier
pub(crate) fn finish_apply(session: &mut PackingSession, event: &PackingEvent) {
    session.version += 1;
    session.last_sequence = event.sequence;
    session.updated_at = event.timestamp;
    session.update_checksum();
}
