//! SessionOpened event applier
//!
//! Applies the SessionOpened event to create the initial session state.

use crate::packing::traits::{EventApplier, finish_apply};
use shared::packing::{PackingEvent, PackingEventPayload, PackingSession, PackingStatus};

/// SessionOpened applier
pub struct SessionOpenedApplier;

impl EventApplier for SessionOpenedApplier {
    fn apply(&self, session: &mut PackingSession, event: &PackingEvent) {
        if let PackingEventPayload::SessionOpened {
            delivery_date,
            items,
        } = &event.payload
        {
            // Set order_id from event (important for replay scenarios)
            session.order_id = event.order_id.clone();
            session.delivery_date = *delivery_date;
            session.items = items.clone();
            session.status = PackingStatus::Confirmed;
            session.notes = None;
            session.consumed_stock.clear();
            session.clear_pause();
            session.created_at = event.timestamp;

            finish_apply(session, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packing::testing::*;
    use chrono::NaiveDate;
    use shared::packing::PackingEventType;

    #[test]
    fn test_session_opened_applier() {
        let mut session = PackingSession::new("order-1".to_string(), NaiveDate::default(), vec![]);
        let event = create_event(
            1,
            PackingEventType::SessionOpened,
            PackingEventPayload::SessionOpened {
                delivery_date: delivery_date(),
                items: vec![create_item("a", "p1", 2, false)],
            },
        );

        SessionOpenedApplier.apply(&mut session, &event);

        assert_eq!(session.delivery_date, delivery_date());
        assert_eq!(session.items.len(), 1);
        assert_eq!(session.status, PackingStatus::Confirmed);
        assert_eq!(session.version, 1);
        assert_eq!(session.last_sequence, 1);
        assert_eq!(session.created_at, event.timestamp);
        assert!(session.verify_checksum());
    }
}
