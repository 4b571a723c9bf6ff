//! StartPacking command handler

use crate::packing::traits::{CommandContext, CommandHandler, CommandMetadata, PackingError};
use shared::packing::{PackingEvent, PackingEventPayload, PackingEventType, PackingStatus};

/// StartPacking action: `Confirmed -> Packing`
#[derive(Debug, Clone)]
pub struct StartPackingAction {
    pub order_id: String,
}

impl CommandHandler for StartPackingAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<PackingEvent>, PackingError> {
        let session = ctx.load_session(&self.order_id)?;

        if session.status != PackingStatus::Confirmed {
            return Err(PackingError::StaleInput(format!(
                "Cannot start packing order {} in status {}",
                self.order_id, session.status
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
            PackingEventType::PackingStarted,
            PackingEventPayload::PackingStarted {},
        );

        Ok(vec![event])
    }
}
