//! Builders shared by the packing unit tests

use super::storage::PackingStorage;
use super::traits::CommandMetadata;
use chrono::NaiveDate;
use redb::WriteTransaction;
use shared::packing::{
    PackingEvent, PackingEventPayload, PackingEventType, PackingItem, PackingSession,
    PackingStatus, StockLevel,
};

pub fn create_test_metadata() -> CommandMetadata {
    CommandMetadata {
        command_id: "cmd-1".to_string(),
        operator_id: "packer-1".to_string(),
        operator_name: "Test Packer".to_string(),
        timestamp: 1_760_000_000_000,
    }
}

pub fn delivery_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn create_item(item_id: &str, product_id: &str, quantity: i32, packed: bool) -> PackingItem {
    PackingItem {
        item_id: item_id.to_string(),
        product_id: product_id.to_string(),
        name: format!("Item {item_id}"),
        quantity,
        packed,
        packed_by: packed.then(|| "packer-1".to_string()),
        packed_at: packed.then_some(1_760_000_000_000),
    }
}

pub fn create_session(order_id: &str, status: PackingStatus, items: Vec<PackingItem>) -> PackingSession {
    let mut session = PackingSession::new(order_id.to_string(), delivery_date(), items);
    session.status = status;
    session.update_checksum();
    session
}

/// Store a session and stock levels inside `txn`
pub fn seed(
    storage: &PackingStorage,
    txn: &WriteTransaction,
    session: &PackingSession,
    stock: &[(&str, i32)],
) {
    storage.store_session(txn, session).unwrap();
    for (product_id, quantity) in stock {
        storage
            .set_stock(txn, product_id, &StockLevel::new(*quantity))
            .unwrap();
    }
}

/// Event for `order-1` issued by the test packer
pub fn create_event(
    sequence: u64,
    event_type: PackingEventType,
    payload: PackingEventPayload,
) -> PackingEvent {
    PackingEvent::new(
        sequence,
        "order-1".to_string(),
        "packer-1".to_string(),
        "Test Packer".to_string(),
        format!("cmd-{sequence}"),
        Some(1_760_000_000_000),
        event_type,
        payload,
    )
}
