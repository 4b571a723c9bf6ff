//! ItemPackToggled event applier
//!
//! Flips one item's packed flag and records who packed it.

use crate::packing::traits::{EventApplier, finish_apply};
use shared::packing::{PackingEvent, PackingEventPayload, PackingSession};

/// ItemPackToggled applier
pub struct ItemPackToggledApplier;

impl EventApplier for ItemPackToggledApplier {
    fn apply(&self, session: &mut PackingSession, event: &PackingEvent) {
        if let PackingEventPayload::ItemPackToggled {
            item_id, packed, ..
        } = &event.payload
        {
            if let Some(item) = session.find_item_mut(item_id) {
                item.packed = *packed;
                if *packed {
                    item.packed_by = Some(event.operator_id.clone());
                    item.packed_at = Some(event.timestamp);
                } else {
                    item.packed_by = None;
                    item.packed_at = None;
                }
            }
            if *packed {
                session.last_packed_by = Some(event.operator_id.clone());
                session.last_packed_at = Some(event.timestamp);
            }

            finish_apply(session, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packing::testing::*;
    use shared::packing::{PackingEventType, PackingStatus};

    fn toggle(seq: u64, item_id: &str, packed: bool) -> PackingEvent {
        create_event(
            seq,
            PackingEventType::ItemPackToggled,
            PackingEventPayload::ItemPackToggled {
                item_id: item_id.to_string(),
                item_name: format!("Item {item_id}"),
                packed,
            },
        )
    }

    #[test]
    fn test_pack_and_unpack_item() {
        let mut session = create_session(
            "order-1",
            PackingStatus::Packing,
            vec![create_item("a", "p1", 1, false), create_item("b", "p2", 1, false)],
        );

        ItemPackToggledApplier.apply(&mut session, &toggle(1, "a", true));
        let item = session.find_item("a").unwrap();
        assert!(item.packed);
        assert_eq!(item.packed_by.as_deref(), Some("packer-1"));
        assert_eq!(session.last_packed_by.as_deref(), Some("packer-1"));
        assert!(!session.find_item("b").unwrap().packed);

        ItemPackToggledApplier.apply(&mut session, &toggle(2, "a", false));
        let item = session.find_item("a").unwrap();
        assert!(!item.packed);
        assert!(item.packed_by.is_none());
        assert_eq!(session.version, 2);
        assert!(session.verify_checksum());
    }
}
