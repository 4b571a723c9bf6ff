//! OrderPaused / OrderResumed event appliers

use crate::packing::traits::{EventApplier, finish_apply};
use shared::packing::{PackingEvent, PackingEventPayload, PackingSession};

/// OrderPaused applier
pub struct OrderPausedApplier;

impl EventApplier for OrderPausedApplier {
    fn apply(&self, session: &mut PackingSession, event: &PackingEvent) {
        if let PackingEventPayload::OrderPaused { reason } = &event.payload {
            session.is_paused = true;
            session.paused_by = Some(event.operator_id.clone());
            session.paused_at = Some(event.timestamp);
            session.pause_reason = reason.clone();
            finish_apply(session, event);
        }
    }
}

/// OrderResumed applier
pub struct OrderResumedApplier;

impl EventApplier for OrderResumedApplier {
    fn apply(&self, session: &mut PackingSession, event: &PackingEvent) {
        if let PackingEventPayload::OrderResumed {} = &event.payload {
            session.clear_pause();
            finish_apply(session, event);
        }
    }
}
