//! redb-based storage for route snapshots and delivery plans
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `route_snapshots` | `YYYY-MM-DD\|TYPE\|G` or `YYYY-MM-DD\|TYPE\|D:<driver>` | `RouteSnapshot` | Sequencing results |
//! | `delivery_plans` | `YYYY-MM-DD` | `DeliveryPlan` | Allocation + staleness fingerprint |
//!
//! A date's delivery snapshots and its plan are always written in the same
//! transaction, so the fingerprint never describes snapshots it did not
//! produce.

use super::allocator::Allocation;
use chrono::NaiveDate;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::{Deserialize, Serialize};
use shared::delivery::{PlanFingerprint, RouteSnapshot, RouteType, SnapshotKey, StopId};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = snapshot storage key, value = JSON-serialized RouteSnapshot
const SNAPSHOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("route_snapshots");

/// key = delivery date, value = JSON-serialized DeliveryPlan
const PLANS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("delivery_plans");

/// Stored result of one delivery planning run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryPlan {
    pub delivery_date: NaiveDate,
    /// Inputs the plan was computed from
    pub fingerprint: PlanFingerprint,
    pub allocation: Allocation,
    /// Ready stops left out of the route for lack of coordinates
    #[serde(default)]
    pub unlocatable: Vec<StopId>,
    pub computed_at: i64,
}

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
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Route storage backed by redb
#[derive(Clone)]
pub struct RouteStorage {
    db: Arc<Database>,
}

impl RouteStorage {
    /// Open or create the database at the given path
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
            let _ = write_txn.open_table(SNAPSHOTS_TABLE)?;
            let _ = write_txn.open_table(PLANS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Snapshot Operations ==========

    /// Store (replace) a snapshot under its key
    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &RouteSnapshot,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
        let key = snapshot.key.storage_key();
        let value = serde_json::to_vec(snapshot)?;
        table.insert(key.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_snapshot(&self, key: &SnapshotKey) -> StorageResult<Option<RouteSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        match table.get(key.storage_key().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All snapshots of one date and route type (global first, then drivers by id)
    pub fn get_snapshots(
        &self,
        delivery_date: NaiveDate,
        route_type: RouteType,
    ) -> StorageResult<Vec<RouteSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;
        let prefix = SnapshotKey::type_prefix(delivery_date, route_type);

        let mut snapshots = Vec::new();
        for result in table.range(prefix.as_str()..)? {
            let (key, value) = result?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            snapshots.push(serde_json::from_slice::<RouteSnapshot>(value.value())?);
        }

        snapshots.sort_by(|a, b| a.key.driver_id.cmp(&b.key.driver_id));
        Ok(snapshots)
    }

    /// Remove every snapshot of one date and route type, returning how many went
    pub fn remove_snapshots(
        &self,
        txn: &WriteTransaction,
        delivery_date: NaiveDate,
        route_type: RouteType,
    ) -> StorageResult<usize> {
        let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
        let prefix = SnapshotKey::type_prefix(delivery_date, route_type);

        let mut keys_to_remove: Vec<String> = Vec::new();
        for result in table.range(prefix.as_str()..)? {
            let (key, _value) = result?;
            let key = key.value();
            if !key.starts_with(&prefix) {
                break;
            }
            keys_to_remove.push(key.to_string());
        }

        for key in &keys_to_remove {
            table.remove(key.as_str())?;
        }
        Ok(keys_to_remove.len())
    }

    // ========== Delivery Plan Operations ==========

    pub fn store_plan(&self, txn: &WriteTransaction, plan: &DeliveryPlan) -> StorageResult<()> {
        let mut table = txn.open_table(PLANS_TABLE)?;
        let key = shared::util::date_key(plan.delivery_date);
        let value = serde_json::to_vec(plan)?;
        table.insert(key.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_plan(&self, delivery_date: NaiveDate) -> StorageResult<Option<DeliveryPlan>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PLANS_TABLE)?;

        match table.get(shared::util::date_key(delivery_date).as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn remove_plan(&self, txn: &WriteTransaction, delivery_date: NaiveDate) -> StorageResult<()> {
        let mut table = txn.open_table(PLANS_TABLE)?;
        table.remove(shared::util::date_key(delivery_date).as_str())?;
        Ok(())
    }

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<RouteStorageStats> {
        let read_txn = self.db.begin_read()?;
        let snapshots_table = read_txn.open_table(SNAPSHOTS_TABLE)?;
        let plans_table = read_txn.open_table(PLANS_TABLE)?;

        Ok(RouteStorageStats {
            snapshot_count: snapshots_table.len()?,
            plan_count: plans_table.len()?,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct RouteStorageStats {
    pub snapshot_count: u64,
    pub plan_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::allocator::allocate;
    use std::collections::{HashMap, HashSet};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn create_test_snapshot(key: SnapshotKey, ids: &[&str]) -> RouteSnapshot {
        let mut snapshot = RouteSnapshot::empty(key, vec![]);
        snapshot.stop_ids = ids.iter().map(|s| s.to_string()).collect();
        snapshot
    }

    #[test]
    fn test_snapshot_storage() {
        let storage = RouteStorage::open_in_memory().unwrap();
        let key = SnapshotKey::global(date(), RouteType::Packing);
        let snapshot = create_test_snapshot(key.clone(), &["a", "b"]);

        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &snapshot).unwrap();
        txn.commit().unwrap();

        let loaded = storage.get_snapshot(&key).unwrap().unwrap();
        assert_eq!(loaded.stop_ids, snapshot.stop_ids);
        assert!(
            storage
                .get_snapshot(&SnapshotKey::global(date(), RouteType::Delivery))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_remove_snapshots_is_scoped_to_date_and_type() {
        let storage = RouteStorage::open_in_memory().unwrap();
        let other_day = date().succ_opt().unwrap();

        let txn = storage.begin_write().unwrap();
        for key in [
            SnapshotKey::global(date(), RouteType::Delivery),
            SnapshotKey::for_driver(date(), "A"),
            SnapshotKey::for_driver(date(), "B"),
            SnapshotKey::global(date(), RouteType::Packing),
            SnapshotKey::for_driver(other_day, "A"),
        ] {
            storage
                .store_snapshot(&txn, &create_test_snapshot(key, &["x"]))
                .unwrap();
        }
        txn.commit().unwrap();

        assert_eq!(storage.get_snapshots(date(), RouteType::Delivery).unwrap().len(), 3);

        let txn = storage.begin_write().unwrap();
        let removed = storage
            .remove_snapshots(&txn, date(), RouteType::Delivery)
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(removed, 3);
        assert!(storage.get_snapshots(date(), RouteType::Delivery).unwrap().is_empty());
        assert_eq!(storage.get_snapshots(date(), RouteType::Packing).unwrap().len(), 1);
        assert_eq!(storage.get_snapshots(other_day, RouteType::Delivery).unwrap().len(), 1);
    }

    #[test]
    fn test_dash_driver_does_not_replace_global() {
        let storage = RouteStorage::open_in_memory().unwrap();
        let global = create_test_snapshot(
            SnapshotKey::global(date(), RouteType::Delivery),
            &["s1", "s2", "s3"],
        );
        let dash = create_test_snapshot(SnapshotKey::for_driver(date(), "-"), &["s1"]);

        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &global).unwrap();
        storage.store_snapshot(&txn, &dash).unwrap();
        txn.commit().unwrap();

        let loaded = storage
            .get_snapshot(&SnapshotKey::global(date(), RouteType::Delivery))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.stop_ids, vec!["s1", "s2", "s3"]);
        let snapshots = storage.get_snapshots(date(), RouteType::Delivery).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].driver_id(), None);
        assert_eq!(snapshots[1].driver_id(), Some("-"));
    }

    #[test]
    fn test_plan_storage() {
        let storage = RouteStorage::open_in_memory().unwrap();
        let global = create_test_snapshot(SnapshotKey::global(date(), RouteType::Delivery), &["s1"]);
        let assignment: HashMap<String, String> = [("s1".to_string(), "A".to_string())].into();
        let ready: HashSet<String> = ["s1".to_string()].into();

        let plan = DeliveryPlan {
            delivery_date: date(),
            fingerprint: PlanFingerprint::compute(&ready, &assignment),
            allocation: allocate(&global, &assignment),
            unlocatable: vec![],
            computed_at: shared::util::now_millis(),
        };

        assert!(storage.get_plan(date()).unwrap().is_none());

        let txn = storage.begin_write().unwrap();
        storage.store_plan(&txn, &plan).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_plan(date()).unwrap(), Some(plan));
        assert_eq!(storage.get_stats().unwrap().plan_count, 1);

        let txn = storage.begin_write().unwrap();
        storage.remove_plan(&txn, date()).unwrap();
        txn.commit().unwrap();
        assert!(storage.get_plan(date()).unwrap().is_none());
    }

    #[test]
    fn test_uncommitted_write_is_invisible() {
        let storage = RouteStorage::open_in_memory().unwrap();
        let key = SnapshotKey::global(date(), RouteType::Delivery);

        let txn = storage.begin_write().unwrap();
        storage
            .store_snapshot(&txn, &create_test_snapshot(key.clone(), &["a"]))
            .unwrap();
        drop(txn);

        assert!(storage.get_snapshot(&key).unwrap().is_none());
    }
}
