//! OrderMarkedReady event applier
//!
//! Records the consumed stock on the session so a later reset can give
//! back exactly the same quantities.

use crate::packing::traits::{EventApplier, finish_apply};
use shared::packing::{PackingEvent, PackingEventPayload, PackingSession, PackingStatus};

/// OrderMarkedReady applier
pub struct OrderMarkedReadyApplier;

impl EventApplier for OrderMarkedReadyApplier {
    fn apply(&self, session: &mut PackingSession, event: &PackingEvent) {
        if let PackingEventPayload::OrderMarkedReady {
            notes, consumed, ..
        } = &event.payload
        {
            session.status = PackingStatus::ReadyForDelivery;
            session.notes = notes.clone();
            session.consumed_stock = consumed.clone();
            finish_apply(session, event);
        }
    }
}
