//! PackingStarted event applier

use crate::packing::traits::{EventApplier, finish_apply};
use shared::packing::{PackingEvent, PackingEventPayload, PackingSession, PackingStatus};

/// PackingStarted applier
pub struct PackingStartedApplier;

impl EventApplier for PackingStartedApplier {
    fn apply(&self, session: &mut PackingSession, event: &PackingEvent) {
        if let PackingEventPayload::PackingStarted {} = &event.payload {
            session.status = PackingStatus::Packing;
            finish_apply(session, event);
        }
    }
}
