//! redb-based storage for packing sessions, their event stream and stock
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `packing_events` | `(order_id, sequence)` | `PackingEvent` | Audit trail (append-only) |
//! | `packing_sessions` | `order_id` | `PackingSession` | Current state |
//! | `stock_levels` | `product_id` | `StockLevel` | Stock store |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `sequence_counter` | `"seq"` | `u64` | Global event sequence |
//!
//! Stock lives next to the sessions so a stock movement and the status
//! change that causes it commit in the same write transaction.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::packing::{PackingEvent, PackingSession, PackingStatus, StockLevel};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = (order_id, sequence), value = JSON-serialized PackingEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("packing_events");

/// key = order_id, value = JSON-serialized PackingSession
const SESSIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("packing_sessions");

/// key = product_id, value = JSON-serialized StockLevel
const STOCK_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("stock_levels");

/// key = command_id, value = empty (idempotency)
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// key = "seq", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Packing storage backed by redb
#[derive(Clone)]
pub struct PackingStorage {
    db: Arc<Database>,
}

impl PackingStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits are durable once `commit()` returns (copy-on-write with
    /// an atomic root swap), so a crash never leaves a half-applied
    /// transition behind.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(SESSIONS_TABLE)?;
            let _ = write_txn.open_table(STOCK_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Current sequence (within transaction)
    pub fn get_sequence_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let table = txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    // ========== Command Idempotency ==========

    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Event Operations ==========

    pub fn store_event(&self, txn: &WriteTransaction, event: &PackingEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let key = (event.order_id.as_str(), event.sequence);
        let value = serde_json::to_vec(event)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// All events of one order, oldest first
    pub fn get_events_for_order(&self, order_id: &str) -> StorageResult<Vec<PackingEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_key, value) = result?;
            events.push(serde_json::from_slice::<PackingEvent>(value.value())?);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Session Operations ==========

    pub fn store_session(
        &self,
        txn: &WriteTransaction,
        session: &PackingSession,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SESSIONS_TABLE)?;
        let value = serde_json::to_vec(session)?;
        table.insert(session.order_id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_session(&self, order_id: &str) -> StorageResult<Option<PackingSession>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_session_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<PackingSession>> {
        let table = txn.open_table(SESSIONS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_all_sessions(&self) -> StorageResult<Vec<PackingSession>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS_TABLE)?;

        let mut sessions = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            sessions.push(serde_json::from_slice::<PackingSession>(value.value())?);
        }
        Ok(sessions)
    }

    /// Sessions actively packing (not paused) with no activity since `cutoff`
    pub fn get_idle_sessions(&self, cutoff: i64) -> StorageResult<Vec<PackingSession>> {
        let mut idle: Vec<PackingSession> = self
            .get_all_sessions()?
            .into_iter()
            .filter(|s| s.status == PackingStatus::Packing && !s.is_paused && s.updated_at < cutoff)
            .collect();
        idle.sort_by_key(|s| s.updated_at);
        Ok(idle)
    }

    // ========== Stock Operations ==========

    pub fn get_stock(&self, product_id: &str) -> StorageResult<Option<StockLevel>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_TABLE)?;

        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_stock_txn(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
    ) -> StorageResult<Option<StockLevel>> {
        let table = txn.open_table(STOCK_TABLE)?;

        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn set_stock(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
        level: &StockLevel,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(STOCK_TABLE)?;
        let value = serde_json::to_vec(level)?;
        table.insert(product_id, value.as_slice())?;
        Ok(())
    }

    /// Add `delta` (negative to consume) to a product's quantity
    ///
    /// Unknown products start from zero. Returns the new level.
    pub fn adjust_stock(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
        delta: i32,
    ) -> StorageResult<StockLevel> {
        let mut level = self
            .get_stock_txn(txn, product_id)?
            .unwrap_or_else(|| StockLevel::new(0));
        level.quantity += delta;
        self.set_stock(txn, product_id, &level)?;
        Ok(level)
    }

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<PackingStorageStats> {
        let read_txn = self.db.begin_read()?;
        let events_table = read_txn.open_table(EVENTS_TABLE)?;
        let sessions_table = read_txn.open_table(SESSIONS_TABLE)?;
        let stock_table = read_txn.open_table(STOCK_TABLE)?;
        let commands_table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(PackingStorageStats {
            event_count: events_table.len()?,
            session_count: sessions_table.len()?,
            product_count: stock_table.len()?,
            processed_command_count: commands_table.len()?,
            current_sequence: seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct PackingStorageStats {
    pub event_count: u64,
    pub session_count: u64,
    pub product_count: u64,
    pub processed_command_count: u64,
    pub current_sequence: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::packing::{PackingEventPayload, PackingEventType};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn create_test_event(order_id: &str, sequence: u64) -> PackingEvent {
        PackingEvent::new(
            sequence,
            order_id.to_string(),
            "op-1".to_string(),
            "Test Packer".to_string(),
            uuid::Uuid::new_v4().to_string(),
            None,
            PackingEventType::PackingStarted,
            PackingEventPayload::PackingStarted {},
        )
    }

    #[test]
    fn test_command_idempotency() {
        let storage = PackingStorage::open_in_memory().unwrap();
        assert!(!storage.is_command_processed("cmd-1").unwrap());

        let txn = storage.begin_write().unwrap();
        storage.mark_command_processed(&txn, "cmd-1").unwrap();
        txn.commit().unwrap();

        assert!(storage.is_command_processed("cmd-1").unwrap());
    }

    #[test]
    fn test_event_storage_is_scoped_per_order() {
        let storage = PackingStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.store_event(&txn, &create_test_event("order-1", 2)).unwrap();
        storage.store_event(&txn, &create_test_event("order-1", 1)).unwrap();
        storage.store_event(&txn, &create_test_event("order-10", 3)).unwrap();
        txn.commit().unwrap();

        let events = storage.get_events_for_order("order-1").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[1].sequence, 2);
    }

    #[test]
    fn test_session_storage() {
        let storage = PackingStorage::open_in_memory().unwrap();
        let session = PackingSession::new("order-1".to_string(), date(), vec![]);

        let txn = storage.begin_write().unwrap();
        storage.store_session(&txn, &session).unwrap();
        assert!(storage.get_session_txn(&txn, "order-1").unwrap().is_some());
        txn.commit().unwrap();

        let loaded = storage.get_session("order-1").unwrap().unwrap();
        assert_eq!(loaded.order_id, "order-1");
        assert!(storage.get_session("missing").unwrap().is_none());
    }

    #[test]
    fn test_adjust_stock() {
        let storage = PackingStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.set_stock(&txn, "apple", &StockLevel::new(10)).unwrap();
        let level = storage.adjust_stock(&txn, "apple", -3).unwrap();
        assert_eq!(level.quantity, 7);
        let fresh = storage.adjust_stock(&txn, "pear", 2).unwrap();
        assert_eq!(fresh.quantity, 2);
        txn.commit().unwrap();

        assert_eq!(storage.get_stock("apple").unwrap().unwrap().quantity, 7);
        assert_eq!(storage.get_stats().unwrap().product_count, 2);
    }

    #[test]
    fn test_idle_sessions() {
        let storage = PackingStorage::open_in_memory().unwrap();

        let mut idle = PackingSession::new("idle".to_string(), date(), vec![]);
        idle.status = PackingStatus::Packing;
        idle.updated_at = 1_000;
        let mut paused = idle.clone();
        paused.order_id = "paused".to_string();
        paused.is_paused = true;
        let mut busy = idle.clone();
        busy.order_id = "busy".to_string();
        busy.updated_at = 9_000;
        let mut confirmed = idle.clone();
        confirmed.order_id = "confirmed".to_string();
        confirmed.status = PackingStatus::Confirmed;

        let txn = storage.begin_write().unwrap();
        for s in [&idle, &paused, &busy, &confirmed] {
            storage.store_session(&txn, s).unwrap();
        }
        txn.commit().unwrap();

        let found = storage.get_idle_sessions(5_000).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].order_id, "idle");
    }
}
