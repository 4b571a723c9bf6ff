//! MarkItemPacked command handler
//!
//! Item-granular and last-write-wins: two packers working different items of
//! the same order both succeed. No stock change.

use crate::packing::traits::{CommandContext, CommandHandler, CommandMetadata, PackingError};
use shared::packing::{PackingEvent, PackingEventPayload, PackingEventType};

/// MarkItemPacked action
#[derive(Debug, Clone)]
pub struct MarkItemPackedAction {
    pub order_id: String,
    pub item_id: String,
    pub packed: bool,
}

impl CommandHandler for MarkItemPackedAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<PackingEvent>, PackingError> {
        let session = ctx.load_session(&self.order_id)?;

        if !session.is_actively_packing() {
            return Err(PackingError::StaleInput(format!(
                "Order {} is not being packed (status {}, paused {})",
                self.order_id, session.status, session.is_paused
            )));
        }

        let item = session
            .find_item(&self.item_id)
            .ok_or_else(|| PackingError::ItemNotFound(self.item_id.clone()))?;

        let seq = ctx.next_sequence();
        let event = PackingEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            PackingEventType::ItemPackToggled,
            PackingEventPayload::ItemPackToggled {
                item_id: self.item_id.clone(),
                item_name: item.name.clone(),
                packed: self.packed,
            },
        );

        Ok(vec![event])
    }
}
