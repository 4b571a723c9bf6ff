//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use crate::packing::pin::PinCheck;
use crate::packing::traits::{CommandContext, CommandHandler, CommandMetadata, PackingError};
use shared::packing::{PackingCommand, PackingCommandPayload, PackingEvent};

mod mark_item_packed;
mod mark_order_ready;
mod open_session;
mod pause_order;
mod reset_order;
mod resume_order;
mod start_packing;
mod update_item_quantity;

pub use mark_item_packed::MarkItemPackedAction;
pub use mark_order_ready::MarkOrderReadyAction;
pub use open_session::OpenSessionAction;
pub use pause_order::PauseOrderAction;
pub use reset_order::ResetOrderAction;
pub use resume_order::ResumeOrderAction;
pub use start_packing::StartPackingAction;
pub use update_item_quantity::UpdateItemQuantityAction;

/// CommandAction enum - dispatches to concrete action implementations
#[derive(Debug)]
pub enum CommandAction {
    OpenSession(OpenSessionAction),
    StartPacking(StartPackingAction),
    MarkItemPacked(MarkItemPackedAction),
    MarkOrderReady(MarkOrderReadyAction),
    PauseOrder(PauseOrderAction),
    ResumeOrder(ResumeOrderAction),
    ResetOrder(ResetOrderAction),
    UpdateItemQuantity(UpdateItemQuantityAction),
}

impl CommandHandler for CommandAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<PackingEvent>, PackingError> {
        match self {
            CommandAction::OpenSession(action) => action.execute(ctx, metadata),
            CommandAction::StartPacking(action) => action.execute(ctx, metadata),
            CommandAction::MarkItemPacked(action) => action.execute(ctx, metadata),
            CommandAction::MarkOrderReady(action) => action.execute(ctx, metadata),
            CommandAction::PauseOrder(action) => action.execute(ctx, metadata),
            CommandAction::ResumeOrder(action) => action.execute(ctx, metadata),
            CommandAction::ResetOrder(action) => action.execute(ctx, metadata),
            CommandAction::UpdateItemQuantity(action) => action.execute(ctx, metadata),
        }
    }
}

/// Convert PackingCommand to CommandAction
///
/// This is the ONLY place with a match on PackingCommandPayload. Values the
/// manager injects (stock threshold, today, PIN verdict) get neutral
/// defaults here and are overwritten by PackingManager.
impl From<&PackingCommand> for CommandAction {
    fn from(cmd: &PackingCommand) -> Self {
        match &cmd.payload {
            PackingCommandPayload::OpenSession {
                order_id,
                delivery_date,
                items,
            } => CommandAction::OpenSession(OpenSessionAction {
                order_id: order_id.clone(),
                delivery_date: *delivery_date,
                items: items.clone(),
            }),
            PackingCommandPayload::StartPacking { order_id } => {
                CommandAction::StartPacking(StartPackingAction {
                    order_id: order_id.clone(),
                })
            }
            PackingCommandPayload::MarkItemPacked {
                order_id,
                item_id,
                packed,
            } => CommandAction::MarkItemPacked(MarkItemPackedAction {
                order_id: order_id.clone(),
                item_id: item_id.clone(),
                packed: *packed,
            }),
            PackingCommandPayload::MarkOrderReady { order_id, notes } => {
                CommandAction::MarkOrderReady(MarkOrderReadyAction {
                    order_id: order_id.clone(),
                    notes: notes.clone(),
                    low_stock_threshold: 0, // Injected by PackingManager
                    today: chrono::Local::now().date_naive(),
                })
            }
            PackingCommandPayload::PauseOrder { order_id, notes } => {
                CommandAction::PauseOrder(PauseOrderAction {
                    order_id: order_id.clone(),
                    notes: notes.clone(),
                })
            }
            PackingCommandPayload::ResumeOrder { order_id } => {
                CommandAction::ResumeOrder(ResumeOrderAction {
                    order_id: order_id.clone(),
                })
            }
            PackingCommandPayload::ResetOrder { order_id, reason } => {
                CommandAction::ResetOrder(ResetOrderAction {
                    order_id: order_id.clone(),
                    reason: reason.clone(),
                })
            }
            PackingCommandPayload::UpdateItemQuantity {
                order_id,
                item_id,
                new_quantity,
                ..
            } => CommandAction::UpdateItemQuantity(UpdateItemQuantityAction {
                order_id: order_id.clone(),
                item_id: item_id.clone(),
                new_quantity: *new_quantity,
                pin_check: PinCheck::NotRequired, // Injected by PackingManager
            }),
        }
    }
}
