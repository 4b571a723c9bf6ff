use super::*;
use crate::packing::pin::HashedPinPolicy;

fn update_quantity(
    manager: &PackingManager,
    item_id: &str,
    new_quantity: i32,
    pin: Option<&str>,
) -> CommandResponse {
    manager.execute_command(cmd(PackingCommandPayload::UpdateItemQuantity {
        order_id: "order-1".to_string(),
        item_id: item_id.to_string(),
        new_quantity,
        pin: pin.map(str::to_string),
    }))
}

// ========================================================================
// Quantity edits
// ========================================================================

#[test]
fn test_quantity_above_stock_is_rejected() {
    let manager = create_test_manager();
    three_item_order(&manager, "order-1");

    let resp = update_quantity(&manager, "b", 4, None);
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::InsufficientStock));
    assert!(resp.error.unwrap().message.contains("p2"));

    assert_eq!(session(&manager, "order-1").find_item("b").unwrap().quantity, 1);
    assert_eq!(stock_of(&manager, "p2"), 3);
}

#[test]
fn test_quantity_within_stock_is_applied() {
    let manager = create_test_manager();
    three_item_order(&manager, "order-1");

    let (resp, events) = manager.execute_command_with_events(cmd(
        PackingCommandPayload::UpdateItemQuantity {
            order_id: "order-1".to_string(),
            item_id: "b".to_string(),
            new_quantity: 3,
            pin: None,
        },
    ));
    assert!(resp.success);
    assert_eq!(session(&manager, "order-1").find_item("b").unwrap().quantity, 3);
    // Stock is only consumed on ready
    assert_eq!(stock_of(&manager, "p2"), 3);

    if let PackingEventPayload::ItemQuantityUpdated {
        previous_quantity,
        pin_verified,
        ..
    } = &events[0].payload
    {
        assert_eq!(*previous_quantity, 1);
        assert!(!pin_verified);
    } else {
        panic!("Expected ItemQuantityUpdated payload");
    }
}

#[test]
fn test_zero_quantity_is_rejected() {
    let manager = create_test_manager();
    three_item_order(&manager, "order-1");

    let resp = update_quantity(&manager, "a", 0, None);
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::InvalidQuantity));
}

#[test]
fn test_quantity_edit_of_packed_item_is_stale() {
    let manager = create_test_manager();
    three_item_order(&manager, "order-1");
    assert!(pack(&manager, "order-1", "a", true).success);

    let resp = update_quantity(&manager, "a", 1, None);
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::StaleInput));
}

#[test]
fn test_unknown_item() {
    let manager = create_test_manager();
    three_item_order(&manager, "order-1");

    let resp = pack(&manager, "order-1", "zzz", true);
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::ItemNotFound));
}

// ========================================================================
// PIN
// ========================================================================

#[test]
fn test_pin_errors_are_distinct_from_quantity_errors() {
    let manager = create_test_manager()
        .with_pin_policy(Arc::new(HashedPinPolicy::from_pin("4321").unwrap()));
    three_item_order(&manager, "order-1");

    // Wrong PIN with an out-of-range quantity reports the PIN
    let resp = update_quantity(&manager, "b", 99, Some("0000"));
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::InvalidPin));

    let resp = update_quantity(&manager, "b", 2, None);
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::InvalidPin));

    // Right PIN, bad quantity
    let resp = update_quantity(&manager, "b", 99, Some("4321"));
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::InsufficientStock));
    let resp = update_quantity(&manager, "b", -1, Some("4321"));
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::InvalidQuantity));

    let (resp, events) = manager.execute_command_with_events(cmd(
        PackingCommandPayload::UpdateItemQuantity {
            order_id: "order-1".to_string(),
            item_id: "b".to_string(),
            new_quantity: 2,
            pin: Some("4321".to_string()),
        },
    ));
    assert!(resp.success);
    assert!(matches!(
        events[0].payload,
        PackingEventPayload::ItemQuantityUpdated {
            pin_verified: true,
            ..
        }
    ));
}

#[test]
fn test_invalid_pin_hash_in_config() {
    let storage = PackingStorage::open_in_memory().unwrap();
    let result = PackingManager::with_storage(
        storage,
        PackingConfig {
            low_stock_threshold: 0,
            pin_hash: Some("plaintext".to_string()),
        },
    );
    assert!(matches!(result, Err(ManagerError::Internal(_))));
}

// ========================================================================
// Stock shortfall and invalid input
// ========================================================================

#[test]
fn test_insufficient_stock_blocks_ready() {
    let manager = create_test_manager();
    three_item_order(&manager, "order-1");
    set_stock(&manager, "p2", 0);
    for item in ["a", "b", "c"] {
        assert!(pack(&manager, "order-1", item, true).success);
    }

    let resp = mark_ready(&manager, "order-1");
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::InsufficientStock));
    assert!(resp.error.unwrap().current.is_none());

    // Nothing consumed, order still packing
    assert_eq!(stock_of(&manager, "p1"), 5);
    assert_eq!(session(&manager, "order-1").status, PackingStatus::Packing);
}

#[test]
fn test_open_session_without_items_is_rejected() {
    let manager = create_test_manager();
    let resp = manager.execute_command(cmd(PackingCommandPayload::OpenSession {
        order_id: "order-1".to_string(),
        delivery_date: delivery_date(),
        items: vec![],
    }));
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::InvalidOperation));
    assert!(manager.get_session("order-1").unwrap().is_none());
}

#[test]
fn test_reset_confirmed_order_is_stale() {
    let manager = create_test_manager();
    open_order(&manager, "order-1", vec![item_input("a", "p1", 1)]);

    let resp = reset(&manager, "order-1");
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::StaleInput));
}

#[test]
fn test_start_twice_is_stale() {
    let manager = create_test_manager();
    three_item_order(&manager, "order-1");

    let resp = manager.execute_command(cmd(PackingCommandPayload::StartPacking {
        order_id: "order-1".to_string(),
    }));
    assert_eq!(resp.error_code(), Some(&CommandErrorCode::StaleInput));
}
