//! ResetOrder command handler
//!
//! Clears packed flags, notes and pause. When the order was ready, the exact
//! stock recorded as consumed is handed back. The order lands in `Packing`,
//! or in `Confirmed` if nothing had been packed and it was not ready.

use crate::packing::traits::{CommandContext, CommandHandler, CommandMetadata, PackingError};
use shared::packing::{PackingEvent, PackingEventPayload, PackingEventType, PackingStatus};

/// ResetOrder action
#[derive(Debug, Clone)]
pub struct ResetOrderAction {
    pub order_id: String,
    pub reason: Option<String>,
}

impl CommandHandler for ResetOrderAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<PackingEvent>, PackingError> {
        let session = ctx.load_session(&self.order_id)?;
        let previous_status = session.status;

        let (new_status, restored) = match previous_status {
            PackingStatus::Confirmed => {
                return Err(PackingError::StaleInput(format!(
                    "Order {} has not started packing",
                    self.order_id
                )));
            }
            PackingStatus::ReadyForDelivery => {
                (PackingStatus::Packing, session.consumed_stock.clone())
            }
            PackingStatus::Packing if session.packed_count() == 0 => {
                (PackingStatus::Confirmed, Vec::new())
            }
            PackingStatus::Packing => (PackingStatus::Packing, Vec::new()),
        };

        let seq = ctx.next_sequence();
        let event = PackingEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            PackingEventType::OrderReset,
            PackingEventPayload::OrderReset {
                reason: self.reason.clone(),
                previous_status,
                new_status,
                restored,
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
    use shared::packing::StockMovement;

    fn action() -> ResetOrderAction {
        ResetOrderAction {
            order_id: "order-1".to_string(),
            reason: Some("wrong items".to_string()),
        }
    }

    fn reset_payload(events: &[PackingEvent]) -> (PackingStatus, Vec<StockMovement>) {
        match &events[0].payload {
            PackingEventPayload::OrderReset {
                new_status,
                restored,
                ..
            } => (*new_status, restored.clone()),
            other => panic!("Expected OrderReset payload, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_ready_order_restores_consumed_stock() {
        let storage = PackingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut session = create_session(
            "order-1",
            PackingStatus::ReadyForDelivery,
            vec![create_item("a", "p1", 2, true)],
        );
        session.consumed_stock = vec![StockMovement {
            product_id: "p1".to_string(),
            quantity: 2,
        }];
        seed(&storage, &txn, &session, &[]);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action().execute(&mut ctx, &create_test_metadata()).unwrap();
        let (new_status, restored) = reset_payload(&events);

        assert_eq!(new_status, PackingStatus::Packing);
        assert_eq!(restored, session.consumed_stock);
    }

    #[test]
    fn test_reset_untouched_order_returns_to_confirmed() {
        let storage = PackingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let session = create_session("order-1", PackingStatus::Packing, vec![create_item("a", "p1", 1, false)]);
        seed(&storage, &txn, &session, &[]);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action().execute(&mut ctx, &create_test_metadata()).unwrap();
        let (new_status, restored) = reset_payload(&events);

        assert_eq!(new_status, PackingStatus::Confirmed);
        assert!(restored.is_empty());
    }

    #[test]
    fn test_reset_paused_order_stays_packing() {
        let storage = PackingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut session = create_session("order-1", PackingStatus::Packing, vec![create_item("a", "p1", 1, true)]);
        session.is_paused = true;
        seed(&storage, &txn, &session, &[]);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action().execute(&mut ctx, &create_test_metadata()).unwrap();
        assert_eq!(reset_payload(&events).0, PackingStatus::Packing);
    }

    #[test]
    fn test_reset_confirmed_order_is_stale() {
        let storage = PackingStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        seed(&storage, &txn, &create_session("order-1", PackingStatus::Confirmed, vec![]), &[]);
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action().execute(&mut ctx, &create_test_metadata());
        assert!(matches!(result, Err(PackingError::StaleInput(_))));
    }
}
