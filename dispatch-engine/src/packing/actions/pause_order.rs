//! PauseOrder command handler
//!
//! Only a started order (at least one item packed) can be paused. Packed
//! flags are kept.

use crate::packing::traits::{CommandContext, CommandHandler, CommandMetadata, PackingError};
use shared::packing::{PackingEvent, PackingEventPayload, PackingEventType, PackingStatus};

/// PauseOrder action
#[derive(Debug, Clone)]
pub struct PauseOrderAction {
    pub order_id: String,
    pub notes: Option<String>,
}

impl CommandHandler for PauseOrderAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<PackingEvent>, PackingError> {
        let session = ctx.load_session(&self.order_id)?;

        if session.status != PackingStatus::Packing || session.is_paused {
            return Err(PackingError::StaleInput(format!(
                "Cannot pause order {} (status {}, paused {})",
                self.order_id, session.status, session.is_paused
            )));
        }
        if session.packed_count() == 0 {
            return Err(PackingError::StaleInput(format!(
                "Order {} has no packed items to pause",
                self.order_id
            )));
        }

        let seq = ctx.next_sequence();
        let event = PackingEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            PackingEventType::OrderPaused,
            PackingEventPayload::OrderPaused {
                reason: self.notes.clone(),
            },
        );

        Ok(vec![event])
    }
}
