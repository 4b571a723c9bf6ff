//! OpenSession command handler
//!
//! Registers the packing sub-document of a confirmed order. Items start
//! unpacked; the session starts in `Confirmed`.

use crate::packing::traits::{CommandContext, CommandHandler, CommandMetadata, PackingError};
use chrono::NaiveDate;
use shared::packing::{
    PackingEvent, PackingEventPayload, PackingEventType, PackingItem, PackingItemInput,
};
use std::collections::HashSet;

/// OpenSession action
#[derive(Debug, Clone)]
pub struct OpenSessionAction {
    pub order_id: String,
    pub delivery_date: NaiveDate,
    pub items: Vec<PackingItemInput>,
}

impl CommandHandler for OpenSessionAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<PackingEvent>, PackingError> {
        // 1. Validate items
        if self.items.is_empty() {
            return Err(PackingError::InvalidOperation(format!(
                "Order {} has no items to pack",
                self.order_id
            )));
        }
        let mut seen = HashSet::new();
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(PackingError::InvalidQuantity(format!(
                    "item {} has quantity {}",
                    item.item_id, item.quantity
                )));
            }
            if !seen.insert(item.item_id.as_str()) {
                return Err(PackingError::InvalidOperation(format!(
                    "Duplicate item id: {}",
                    item.item_id
                )));
            }
        }

        // 2. One session per order
        if ctx.session_exists(&self.order_id)? {
            return Err(PackingError::SessionAlreadyExists(self.order_id.clone()));
        }

        let items = self
            .items
            .iter()
            .map(|input| PackingItem {
                item_id: input.item_id.clone(),
                product_id: input.product_id.clone(),
                name: input.name.clone(),
                quantity: input.quantity,
                packed: false,
                packed_by: None,
                packed_at: None,
            })
            .collect();

        let seq = ctx.next_sequence();
        let event = PackingEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            PackingEventType::SessionOpened,
            PackingEventPayload::SessionOpened {
                delivery_date: self.delivery_date,
                items,
            },
        );

        Ok(vec![event])
    }
}
