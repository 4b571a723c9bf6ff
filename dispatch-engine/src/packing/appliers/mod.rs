//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles
//! one specific event type. Appliers are PURE functions.

use enum_dispatch::enum_dispatch;

use crate::packing::traits::EventApplier;
use shared::packing::{PackingEvent, PackingEventPayload, PackingSession};

mod item_pack_toggled;
mod item_quantity_updated;
mod order_marked_ready;
mod order_paused;
mod order_reset;
mod packing_started;
mod session_opened;

pub use item_pack_toggled::ItemPackToggledApplier;
pub use item_quantity_updated::ItemQuantityUpdatedApplier;
pub use order_marked_ready::OrderMarkedReadyApplier;
pub use order_paused::{OrderPausedApplier, OrderResumedApplier};
pub use order_reset::OrderResetApplier;
pub use packing_started::PackingStartedApplier;
pub use session_opened::SessionOpenedApplier;

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    SessionOpened(SessionOpenedApplier),
    PackingStarted(PackingStartedApplier),
    ItemPackToggled(ItemPackToggledApplier),
    ItemQuantityUpdated(ItemQuantityUpdatedApplier),
    OrderMarkedReady(OrderMarkedReadyApplier),
    OrderPaused(OrderPausedApplier),
    OrderResumed(OrderResumedApplier),
    OrderReset(OrderResetApplier),
}

/// Convert PackingEvent reference to EventAction
///
/// This is the ONLY place with a match on PackingEventPayload.
impl From<&PackingEvent> for EventAction {
    fn from(event: &PackingEvent) -> Self {
        match &event.payload {
            PackingEventPayload::SessionOpened { .. } => {
                EventAction::SessionOpened(SessionOpenedApplier)
            }
            PackingEventPayload::PackingStarted { .. } => {
                EventAction::PackingStarted(PackingStartedApplier)
            }
            PackingEventPayload::ItemPackToggled { .. } => {
                EventAction::ItemPackToggled(ItemPackToggledApplier)
            }
            PackingEventPayload::ItemQuantityUpdated { .. } => {
                EventAction::ItemQuantityUpdated(ItemQuantityUpdatedApplier)
            }
            PackingEventPayload::OrderMarkedReady { .. } => {
                EventAction::OrderMarkedReady(OrderMarkedReadyApplier)
            }
            PackingEventPayload::OrderPaused { .. } => EventAction::OrderPaused(OrderPausedApplier),
            PackingEventPayload::OrderResumed { .. } => {
                EventAction::OrderResumed(OrderResumedApplier)
            }
            PackingEventPayload::OrderReset { .. } => EventAction::OrderReset(OrderResetApplier),
        }
    }
}

/// Fold an event stream into a session
///
/// Events must belong to one order and be in sequence order. Returns `None`
/// for an empty stream.
pub fn replay(events: &[PackingEvent]) -> Option<PackingSession> {
    let first = events.first()?;
    let mut session = PackingSession::new(first.order_id.clone(), Default::default(), vec![]);
    for event in events {
        EventAction::from(event).apply(&mut session, event);
    }
    Some(session)
}
