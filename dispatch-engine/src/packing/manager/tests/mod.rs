use super::*;
use crate::packing::testing::{create_event, delivery_date};
use shared::packing::{CommandErrorCode, PackingEventType, PackingItemInput, PackingStatus};

fn create_test_manager() -> PackingManager {
    create_manager_with(PackingConfig::default())
}

fn create_manager_with(config: PackingConfig) -> PackingManager {
    let storage = PackingStorage::open_in_memory().unwrap();
    PackingManager::with_storage(storage, config).unwrap()
}

fn cmd(payload: PackingCommandPayload) -> PackingCommand {
    PackingCommand::new("packer-1", "Test Packer", payload)
}

fn item_input(item_id: &str, product_id: &str, quantity: i32) -> PackingItemInput {
    PackingItemInput {
        item_id: item_id.to_string(),
        product_id: product_id.to_string(),
        name: format!("Item {item_id}"),
        quantity,
    }
}

fn set_stock(manager: &PackingManager, product_id: &str, quantity: i32) {
    manager
        .set_stock_level(product_id, StockLevel::new(quantity))
        .unwrap();
}

fn stock_of(manager: &PackingManager, product_id: &str) -> i32 {
    manager
        .stock_level(product_id)
        .unwrap()
        .map(|l| l.quantity)
        .unwrap_or(0)
}

// ========================================================================
// Helpers: drive an order through its lifecycle
// ========================================================================

fn open_order(manager: &PackingManager, order_id: &str, items: Vec<PackingItemInput>) {
    let resp = manager.execute_command(cmd(PackingCommandPayload::OpenSession {
        order_id: order_id.to_string(),
        delivery_date: delivery_date(),
        items,
    }));
    assert!(resp.success, "Failed to open session: {:?}", resp.error);
}

fn start_order(manager: &PackingManager, order_id: &str) {
    let resp = manager.execute_command(cmd(PackingCommandPayload::StartPacking {
        order_id: order_id.to_string(),
    }));
    assert!(resp.success, "Failed to start packing: {:?}", resp.error);
}

fn pack(manager: &PackingManager, order_id: &str, item_id: &str, packed: bool) -> CommandResponse {
    manager.execute_command(cmd(PackingCommandPayload::MarkItemPacked {
        order_id: order_id.to_string(),
        item_id: item_id.to_string(),
        packed,
    }))
}

fn mark_ready(manager: &PackingManager, order_id: &str) -> CommandResponse {
    manager.execute_command(cmd(PackingCommandPayload::MarkOrderReady {
        order_id: order_id.to_string(),
        notes: None,
    }))
}

fn reset(manager: &PackingManager, order_id: &str) -> CommandResponse {
    manager.execute_command(cmd(PackingCommandPayload::ResetOrder {
        order_id: order_id.to_string(),
        reason: Some("recount".to_string()),
    }))
}

fn session(manager: &PackingManager, order_id: &str) -> PackingSession {
    manager.get_session(order_id).unwrap().unwrap()
}

/// Order with items a(p1 x2), b(p2 x1), c(p1 x1), started, stock p1=5 p2=3
fn three_item_order(manager: &PackingManager, order_id: &str) {
    set_stock(manager, "p1", 5);
    set_stock(manager, "p2", 3);
    open_order(
        manager,
        order_id,
        vec![
            item_input("a", "p1", 2),
            item_input("b", "p2", 1),
            item_input("c", "p1", 1),
        ],
    );
    start_order(manager, order_id);
}

// ========================================================================
// Core
// ========================================================================

#[test]
fn test_open_session_creates_confirmed_session() {
    let manager = create_test_manager();

    let (resp, events) = manager.execute_command_with_events(cmd(PackingCommandPayload::OpenSession {
        order_id: "order-1".to_string(),
        delivery_date: delivery_date(),
        items: vec![item_input("a", "p1", 2)],
    }));

    assert!(resp.success);
    assert_eq!(resp.order_id.as_deref(), Some("order-1"));
    assert_eq!(resp.version, Some(1));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, PackingEventType::SessionOpened);

    let stored = session(&manager, "order-1");
    assert_eq!(stored.status, PackingStatus::Confirmed);
    assert_eq!(stored.delivery_date, delivery_date());
    assert!(stored.verify_checksum());
}

#[test]
fn test_open_session_twice_is_rejected() {
    let manager = create_test_manager();
    open_order(&manager, "order-1", vec![item_input("a", "p1", 1)]);

    let resp = manager.execute_command(cmd(PackingCommandPayload::OpenSession {
        order_id: "order-1".to_string(),
        delivery_date: delivery_date(),
        items: vec![item_input("a", "p1", 1)],
    }));

    assert!(!resp.success);
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::SessionAlreadyExists));
}

#[test]
fn test_unknown_session() {
    let manager = create_test_manager();
    let resp = pack(&manager, "missing", "a", true);
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::SessionNotFound));
}

#[test]
fn test_duplicate_command_id_is_acknowledged_once() {
    let manager = create_test_manager();
    three_item_order(&manager, "order-1");

    let command = cmd(PackingCommandPayload::MarkItemPacked {
        order_id: "order-1".to_string(),
        item_id: "a".to_string(),
        packed: true,
    });
    let first = manager.execute_command(command.clone());
    assert!(first.success);
    let sequence = manager.get_current_sequence().unwrap();
    let version = session(&manager, "order-1").version;

    let second = manager.execute_command(command);
    assert!(second.success);
    assert!(second.duplicate);
    assert_eq!(manager.get_current_sequence().unwrap(), sequence);
    assert_eq!(session(&manager, "order-1").version, version);
    assert_eq!(manager.get_events_for_order("order-1").unwrap().len(), 3);
}

#[test]
fn test_events_are_broadcast_after_commit() {
    let manager = create_test_manager();
    let mut rx = manager.subscribe();

    open_order(&manager, "order-1", vec![item_input("a", "p1", 1)]);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.event_type, PackingEventType::SessionOpened);
    assert_eq!(event.order_id, "order-1");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_failed_command_is_not_broadcast() {
    let manager = create_test_manager();
    open_order(&manager, "order-1", vec![item_input("a", "p1", 1)]);
    let mut rx = manager.subscribe();

    // Not started yet
    let resp = pack(&manager, "order-1", "a", true);
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::StaleInput));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_sequence_is_global_across_orders() {
    let manager = create_test_manager();
    open_order(&manager, "order-1", vec![item_input("a", "p1", 1)]);
    open_order(&manager, "order-2", vec![item_input("a", "p1", 1)]);
    start_order(&manager, "order-1");

    let one = manager.get_events_for_order("order-1").unwrap();
    let two = manager.get_events_for_order("order-2").unwrap();
    assert_eq!(one.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(two[0].sequence, 2);
    assert_eq!(manager.get_current_sequence().unwrap(), 3);
}

#[test]
fn test_rebuild_matches_stored_session() {
    let manager = create_test_manager();
    three_item_order(&manager, "order-1");
    for item in ["a", "b", "c"] {
        assert!(pack(&manager, "order-1", item, true).success);
    }
    assert!(pack(&manager, "order-1", "b", false).success);
    assert!(pack(&manager, "order-1", "b", true).success);
    assert!(mark_ready(&manager, "order-1").success);
    assert!(reset(&manager, "order-1").success);

    let rebuilt = manager.rebuild_session("order-1").unwrap();
    assert_eq!(rebuilt, session(&manager, "order-1"));
}

#[test]
fn test_rebuild_unknown_session() {
    let manager = create_test_manager();
    assert!(matches!(
        manager.rebuild_session("missing"),
        Err(ManagerError::SessionNotFound(_))
    ));
}

// ========================================================================
// Session lookup while applying events
// ========================================================================

#[test]
fn test_missing_session_is_only_created_by_session_opened() {
    let storage = PackingStorage::open_in_memory().unwrap();
    let txn = storage.begin_write().unwrap();
    let ctx = CommandContext::new(&txn, &storage, 0);

    let started = create_event(
        1,
        PackingEventType::PackingStarted,
        PackingEventPayload::PackingStarted {},
    );
    assert!(matches!(
        session_for_event(&ctx, &started),
        Err(PackingError::SessionNotFound(_))
    ));

    let opened = create_event(
        1,
        PackingEventType::SessionOpened,
        PackingEventPayload::SessionOpened {
            delivery_date: delivery_date(),
            items: vec![],
        },
    );
    let blank = session_for_event(&ctx, &opened).unwrap();
    assert_eq!(blank.order_id, "order-1");
    assert_eq!(blank.version, 0);
}

#[test]
fn test_existing_session_is_loaded_for_events() {
    let manager = create_test_manager();
    three_item_order(&manager, "order-1");

    let storage = manager.storage();
    let txn = storage.begin_write().unwrap();
    let ctx = CommandContext::new(&txn, storage, 0);
    let event = create_event(
        9,
        PackingEventType::OrderPaused,
        PackingEventPayload::OrderPaused { reason: None },
    );

    let loaded = session_for_event(&ctx, &event).unwrap();
    assert_eq!(loaded, session(&manager, "order-1"));
    assert_eq!(loaded.items.len(), 3);
}

mod test_boundary;
