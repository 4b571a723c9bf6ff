//! ResumeOrder command handler

use crate::packing::traits::{CommandContext, CommandHandler, CommandMetadata, PackingError};
use shared::packing::{PackingEvent, PackingEventPayload, PackingEventType};

/// ResumeOrder action: clears the pause flag
#[derive(Debug, Clone)]
pub struct ResumeOrderAction {
    pub order_id: String,
}

impl CommandHandler for ResumeOrderAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<PackingEvent>, PackingError> {
        let session = ctx.load_session(&self.order_id)?;

        if !session.is_paused {
            return Err(PackingError::StaleInput(format!(
                "Order {} is not paused",
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
            PackingEventType::OrderResumed,
            PackingEventPayload::OrderResumed {},
        );

        Ok(vec![event])
    }
}
