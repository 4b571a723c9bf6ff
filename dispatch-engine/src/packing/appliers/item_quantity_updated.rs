//! ItemQuantityUpdated event applier

use crate::packing::traits::{EventApplier, finish_apply};
use shared::packing::{PackingEvent, PackingEventPayload, PackingSession};

/// ItemQuantityUpdated applier
pub struct ItemQuantityUpdatedApplier;

impl EventApplier for ItemQuantityUpdatedApplier {
    fn apply(&self, session: &mut PackingSession, event: &PackingEvent) {
        if let PackingEventPayload::ItemQuantityUpdated {
            item_id,
            new_quantity,
            ..
        } = &event.payload
        {
            if let Some(item) = session.find_item_mut(item_id) {
                item.quantity = *new_quantity;
            }
            finish_apply(session, event);
        }
    }
}
