//! UpdateItemQuantity command handler
//!
//! Allowed while packing (not paused) on an unpacked item. The PIN verdict
//! is computed by the manager before the transaction and checked here
//! ahead of the quantity guards. Stock is only read, never written.

use crate::packing::pin::PinCheck;
use crate::packing::traits::{CommandContext, CommandHandler, CommandMetadata, PackingError};
use shared::packing::{PackingEvent, PackingEventPayload, PackingEventType};

/// UpdateItemQuantity action
#[derive(Debug, Clone)]
pub struct UpdateItemQuantityAction {
    pub order_id: String,
    pub item_id: String,
    pub new_quantity: i32,
    /// Injected by PackingManager
    pub pin_check: PinCheck,
}

impl CommandHandler for UpdateItemQuantityAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<PackingEvent>, PackingError> {
        let session = ctx.load_session(&self.order_id)?;

        // 1. State guards
        if !session.is_actively_packing() {
            return Err(PackingError::StaleInput(format!(
                "Order {} is not being packed (status {}, paused {})",
                self.order_id, session.status, session.is_paused
            )));
        }
        let item = session
            .find_item(&self.item_id)
            .ok_or_else(|| PackingError::ItemNotFound(self.item_id.clone()))?;
        if item.packed {
            return Err(PackingError::StaleInput(format!(
                "Item {} is already packed",
                self.item_id
            )));
        }

        // 2. PIN
        if !self.pin_check.is_accepted() {
            return Err(PackingError::InvalidPin);
        }

        // 3. Quantity bounds against current stock
        if self.new_quantity <= 0 {
            return Err(PackingError::InvalidQuantity(format!(
                "quantity must be positive, got {}",
                self.new_quantity
            )));
        }
        let available = ctx
            .load_stock(&item.product_id)?
            .map(|level| level.quantity)
            .unwrap_or(0);
        if self.new_quantity > available {
            return Err(PackingError::InsufficientStock {
                product_id: item.product_id.clone(),
                requested: self.new_quantity,
                available,
            });
        }

        let seq = ctx.next_sequence();
        let event = PackingEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            PackingEventType::ItemQuantityUpdated,
            PackingEventPayload::ItemQuantityUpdated {
                item_id: self.item_id.clone(),
                item_name: item.name.clone(),
                previous_quantity: item.quantity,
                new_quantity: self.new_quantity,
                pin_verified: self.pin_check == PinCheck::Verified,
            },
        );

        Ok(vec![event])
    }
}
