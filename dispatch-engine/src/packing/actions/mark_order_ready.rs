//! MarkOrderReady command handler
//!
//! Guards: status `Packing`, not paused, every item packed. Consumes stock
//! for every item (aggregated per product); if any product is short the
//! whole command fails and nothing is consumed. Low-stock and expiry
//! observations ride along as warnings.

use crate::packing::stock::plan_consumption;
use crate::packing::traits::{CommandContext, CommandHandler, CommandMetadata, PackingError};
use chrono::NaiveDate;
use shared::packing::{PackingEvent, PackingEventPayload, PackingEventType, PackingStatus};

/// MarkOrderReady action
#[derive(Debug, Clone)]
pub struct MarkOrderReadyAction {
    pub order_id: String,
    pub notes: Option<String>,
    /// Injected by PackingManager
    pub low_stock_threshold: i32,
    /// Injected by PackingManager
    pub today: NaiveDate,
}

impl CommandHandler for MarkOrderReadyAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<PackingEvent>, PackingError> {
        let session = ctx.load_session(&self.order_id)?;

        // 1. State guards
        if session.status != PackingStatus::Packing {
            return Err(PackingError::StaleInput(format!(
                "Cannot mark order {} ready in status {}",
                self.order_id, session.status
            )));
        }
        if session.is_paused {
            return Err(PackingError::StaleInput(format!(
                "Order {} is paused",
                self.order_id
            )));
        }
        if !session.all_items_packed() {
            return Err(PackingError::StaleInput(format!(
                "Order {} has {} of {} items packed",
                self.order_id,
                session.packed_count(),
                session.items.len()
            )));
        }

        // 2. Stock (read-only here; the manager applies the movements)
        let (consumed, warnings) = plan_consumption(
            ctx,
            &session.items,
            self.low_stock_threshold,
            self.today,
            session.delivery_date,
        )?;

        let seq = ctx.next_sequence();
        let event = PackingEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            PackingEventType::OrderMarkedReady,
            PackingEventPayload::OrderMarkedReady {
                notes: self.notes.clone(),
                consumed,
                warnings,
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packing::storage::PackingStorage;
    use crate::packing::testing::*;
    use shared::packing::StockWarningKind;

    fn action() -> MarkOrderReadyAction {
        MarkOrderReadyAction {
            order_id: "order-1".to_string(),
            notes: Some("fragile".to_string()),
            low_stock_threshold: 1,
            today: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        }
    }

    #[test]
    fn test_partially_packed_order_is_stale() {
        let storage = PackingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let session = create_session(
            "order-1",
            PackingStatus::Packing,
            vec![
                create_item("a", "p1", 1, true),
                create_item("b", "p2", 1, true),
                create_item("c", "p3", 1, false),
            ],
        );
        seed(&storage, &txn, &session, &[("p1", 5), ("p2", 5), ("p3", 5)]);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action().execute(&mut ctx, &create_test_metadata());
        assert!(matches!(result, Err(PackingError::StaleInput(_))));
    }

    #[test]
    fn test_ready_carries_consumption_and_warnings() {
        let storage = PackingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let session = create_session(
            "order-1",
            PackingStatus::Packing,
            vec![
                create_item("a", "p1", 2, true),
                create_item("b", "p1", 1, true),
                create_item("c", "p2", 1, true),
            ],
        );
        seed(&storage, &txn, &session, &[("p1", 4), ("p2", 10)]);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action().execute(&mut ctx, &create_test_metadata()).unwrap();

        if let PackingEventPayload::OrderMarkedReady { consumed, warnings, notes } = &events[0].payload {
            assert_eq!(notes.as_deref(), Some("fragile"));
            assert_eq!(consumed.len(), 2);
            assert_eq!(consumed[0].product_id, "p1");
            assert_eq!(consumed[0].quantity, 3);
            assert_eq!(warnings.len(), 1);
            assert_eq!(warnings[0].kind, StockWarningKind::LowStock { remaining: 1 });
        } else {
            panic!("Expected OrderMarkedReady payload");
        }
        // Nothing written by the action itself
        assert_eq!(storage.get_stock_txn(&txn, "p1").unwrap().unwrap().quantity, 4);
    }

    #[test]
    fn test_insufficient_stock_fails() {
        let storage = PackingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let session = create_session(
            "order-1",
            PackingStatus::Packing,
            vec![create_item("a", "p1", 1, true), create_item("b", "p2", 3, true)],
        );
        seed(&storage, &txn, &session, &[("p1", 5), ("p2", 2)]);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action().execute(&mut ctx, &create_test_metadata());
        match result {
            Err(PackingError::InsufficientStock {
                product_id,
                requested,
                available,
            }) => {
                assert_eq!(product_id, "p2");
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_paused_order_is_stale() {
        let storage = PackingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut session = create_session("order-1", PackingStatus::Packing, vec![create_item("a", "p1", 1, true)]);
        session.is_paused = true;
        seed(&storage, &txn, &session, &[("p1", 5)]);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action().execute(&mut ctx, &create_test_metadata());
        assert!(matches!(result, Err(PackingError::StaleInput(_))));
    }
}
