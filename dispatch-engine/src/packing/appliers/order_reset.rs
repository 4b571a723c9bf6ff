//! OrderReset event applier
//!
//! Clears every packed flag, the notes, the pause and the consumed-stock
//! record, then moves to the status carried by the event.

use crate::packing::traits::{EventApplier, finish_apply};
use shared::packing::{PackingEvent, PackingEventPayload, PackingSession};

/// OrderReset applier
pub struct OrderResetApplier;

impl EventApplier for OrderResetApplier {
    fn apply(&self, session: &mut PackingSession, event: &PackingEvent) {
        if let PackingEventPayload::OrderReset { new_status, .. } = &event.payload {
            for item in &mut session.items {
                item.packed = false;
                item.packed_by = None;
                item.packed_at = None;
            }
            session.status = *new_status;
            session.notes = None;
            session.consumed_stock.clear();
            session.last_packed_by = None;
            session.last_packed_at = None;
            session.clear_pause();

            finish_apply(session, event);
        }
    }
}
