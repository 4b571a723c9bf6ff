//! PackingManager - command processing for the packing state machine
//!
//! This module handles:
//! - Command validation and processing
//! - Event generation with global sequence numbers
//! - Stock movements, committed with the status change that causes them
//! - Persistence to redb (transactional)
//! - Event broadcasting
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. PIN verdict (quantity edits only)
//!     ├─ 3. Begin write transaction, re-check idempotency
//!     ├─ 4. Optimistic version check (order-level commands)
//!     ├─ 5. Convert command to action and execute
//!     ├─ 6. Apply events to sessions via EventApplier
//!     ├─ 7. Persist events, sessions and stock movements
//!     ├─ 8. Mark command processed, commit
//!     ├─ 9. Broadcast event(s)
//!     └─ 10. Return response
//! ```
//!
//! redb serializes write transactions, so two commands on the same order
//! never interleave: the second one runs its guards against the state the
//! first one committed.

mod error;
pub use error::*;

use super::actions::{CommandAction, MarkOrderReadyAction, UpdateItemQuantityAction};
use super::appliers::{EventAction, replay};
use super::pin::{HashedPinPolicy, NoPinPolicy, PinCheck, PinPolicy};
use super::storage::{PackingStorage, StorageError};
use super::traits::{
    CommandContext, CommandHandler, CommandMetadata, EventApplier, PackingError,
};
use crate::core::{Config, PackingConfig};
use chrono::NaiveDate;
use shared::packing::{
    CommandResponse, PackingCommand, PackingCommandPayload, PackingEvent, PackingEventPayload,
    PackingEventType, PackingSession, StockLevel, StockWarning,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// PackingManager for command processing
#[derive(Clone)]
pub struct PackingManager {
    storage: PackingStorage,
    event_tx: broadcast::Sender<PackingEvent>,
    pin_policy: Arc<dyn PinPolicy>,
    config: PackingConfig,
}

impl std::fmt::Debug for PackingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackingManager")
            .field("storage", &"<PackingStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("pin_required", &self.pin_policy.is_pin_required())
            .field("low_stock_threshold", &self.config.low_stock_threshold)
            .finish()
    }
}

impl PackingManager {
    /// Create a new PackingManager with the given database path
    pub fn new(db_path: impl AsRef<Path>, config: PackingConfig) -> ManagerResult<Self> {
        let storage = PackingStorage::open(db_path)?;
        Self::with_storage(storage, config)
    }

    /// Open `packing.redb` under the configured data directory
    pub fn from_config(config: &Config) -> ManagerResult<Self> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            ManagerError::Internal(format!(
                "Cannot create data dir {}: {}",
                config.data_dir.display(),
                e
            ))
        })?;
        Self::new(config.packing_db_path(), config.packing.clone())
    }

    /// Create a PackingManager over existing storage
    pub fn with_storage(storage: PackingStorage, config: PackingConfig) -> ManagerResult<Self> {
        let pin_policy: Arc<dyn PinPolicy> = match &config.pin_hash {
            Some(phc) => Arc::new(
                HashedPinPolicy::new(phc.as_str())
                    .map_err(|e| ManagerError::Internal(e.to_string()))?,
            ),
            None => Arc::new(NoPinPolicy),
        };
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        tracing::info!(
            pin_required = pin_policy.is_pin_required(),
            low_stock_threshold = config.low_stock_threshold,
            "PackingManager started"
        );
        Ok(Self {
            storage,
            event_tx,
            pin_policy,
            config,
        })
    }

    /// Replace the PIN policy
    pub fn with_pin_policy(mut self, pin_policy: Arc<dyn PinPolicy>) -> Self {
        self.pin_policy = pin_policy;
        self
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<PackingEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &PackingStorage {
        &self.storage
    }

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: PackingCommand) -> CommandResponse {
        self.execute_command_with_events(cmd).0
    }

    /// Execute a command and return both the response and generated events
    ///
    /// Events are broadcast as well.
    pub fn execute_command_with_events(
        &self,
        cmd: PackingCommand,
    ) -> (CommandResponse, Vec<PackingEvent>) {
        let command_id = cmd.command_id.clone();
        let order_id = cmd.payload.order_id().to_string();
        let kind = cmd.payload.kind();
        let operator_id = cmd.operator_id.clone();

        match self.process_command(cmd) {
            Ok((response, events)) => {
                // Broadcast events after successful commit
                for event in &events {
                    if self.event_tx.send(event.clone()).is_err() {
                        tracing::warn!("Event broadcast failed: no active receivers");
                        break;
                    }
                }
                (response, events)
            }
            Err(err) => {
                tracing::info!(
                    target: "audit",
                    command_id = %command_id,
                    order_id = %order_id,
                    operator_id = %operator_id,
                    command = kind,
                    error = %err,
                    "Packing command rejected"
                );
                let current = if err.wants_current_state() {
                    self.storage
                        .get_session(&order_id)
                        .ok()
                        .flatten()
                        .map(Box::new)
                } else {
                    None
                };
                let error = shared::packing::CommandError::from(err).with_current(current);
                (CommandResponse::error(command_id, error), vec![])
            }
        }
    }

    /// Process command and return response with events
    fn process_command(
        &self,
        cmd: PackingCommand,
    ) -> ManagerResult<(CommandResponse, Vec<PackingEvent>)> {
        tracing::debug!(command_id = %cmd.command_id, payload = ?cmd.payload, "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 2. PIN verdict, computed outside the write transaction
        let pin_check = match &cmd.payload {
            PackingCommandPayload::UpdateItemQuantity { pin, .. } => {
                Some(PinCheck::evaluate(self.pin_policy.as_ref(), pin.as_deref()))
            }
            _ => None,
        };

        // 3. Begin write transaction
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within transaction
        if self
            .storage
            .is_command_processed_txn(&txn, &cmd.command_id)?
        {
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 4. Optimistic version check
        let order_id = cmd.payload.order_id().to_string();
        if let Some(expected) = cmd.expected_version
            && !cmd.payload.is_item_level()
            && let Some(session) = self.storage.get_session_txn(&txn, &order_id)?
            && session.version != expected
        {
            return Err(ManagerError::ConcurrencyConflict {
                order_id,
                expected,
                actual: session.version,
            });
        }

        let current_sequence = self.storage.get_sequence_txn(&txn)?;
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            operator_id: cmd.operator_id.clone(),
            operator_name: cmd.operator_name.clone(),
            timestamp: cmd.timestamp,
        };

        // 5. Convert to action and execute
        // MarkOrderReady: inject stock threshold and today's date
        // UpdateItemQuantity: inject the PIN verdict
        let action: CommandAction = match &cmd.payload {
            PackingCommandPayload::MarkOrderReady { order_id, notes } => {
                CommandAction::MarkOrderReady(MarkOrderReadyAction {
                    order_id: order_id.clone(),
                    notes: notes.clone(),
                    low_stock_threshold: self.config.low_stock_threshold,
                    today: today(),
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
                pin_check: pin_check.unwrap_or(PinCheck::NotRequired),
            }),
            _ => (&cmd).into(),
        };
        let events = action
            .execute(&mut ctx, &metadata)
            .map_err(ManagerError::from)?;

        // 6. Apply events to sessions
        let mut warnings: Vec<StockWarning> = Vec::new();
        for event in &events {
            let mut session = session_for_event(&ctx, event).map_err(ManagerError::from)?;

            let applier: EventAction = event.into();
            applier.apply(&mut session, event);
            ctx.save_session(session);

            if let PackingEventPayload::OrderMarkedReady { warnings: w, .. } = &event.payload {
                warnings.extend(w.iter().cloned());
            }
        }

        // 7. Persist events, stock movements and sessions
        for event in &events {
            self.storage.store_event(&txn, event)?;
            self.apply_stock_movements(&txn, event)?;
        }

        let mut version = None;
        for session in ctx.modified_sessions() {
            self.storage.store_session(&txn, session)?;
            if session.order_id == order_id {
                version = Some(session.version);
            }
        }

        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }

        // 8. Mark command processed and commit
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;
        drop(ctx);
        txn.commit().map_err(StorageError::from)?;

        for event in &events {
            tracing::info!(
                target: "audit",
                command_id = %cmd.command_id,
                order_id = %event.order_id,
                operator_id = %event.operator_id,
                event_type = %event.event_type,
                sequence = event.sequence,
                "Packing event recorded"
            );
        }
        if !warnings.is_empty() {
            tracing::warn!(order_id = %order_id, warnings = ?warnings, "Stock warnings");
        }

        let mut response = CommandResponse::success(cmd.command_id, Some(order_id));
        if let Some(version) = version {
            response = response.with_version(version);
        }
        Ok((response.with_warnings(warnings), events))
    }

    /// Decrement on ready, restore on reset
    fn apply_stock_movements(
        &self,
        txn: &redb::WriteTransaction,
        event: &PackingEvent,
    ) -> ManagerResult<()> {
        let (movements, sign) = match &event.payload {
            PackingEventPayload::OrderMarkedReady { consumed, .. } => (consumed, -1),
            PackingEventPayload::OrderReset { restored, .. } => (restored, 1),
            _ => return Ok(()),
        };
        for movement in movements {
            let level = self
                .storage
                .adjust_stock(txn, &movement.product_id, sign * movement.quantity)?;
            tracing::debug!(
                product_id = %movement.product_id,
                delta = sign * movement.quantity,
                remaining = level.quantity,
                "Stock adjusted"
            );
        }
        Ok(())
    }

    // ========== Stock ==========

    /// Current stock of a product
    pub fn stock_level(&self, product_id: &str) -> ManagerResult<Option<StockLevel>> {
        Ok(self.storage.get_stock(product_id)?)
    }

    /// Set stock on hand (inventory intake)
    pub fn set_stock_level(&self, product_id: &str, level: StockLevel) -> ManagerResult<()> {
        let txn = self.storage.begin_write()?;
        self.storage.set_stock(&txn, product_id, &level)?;
        txn.commit().map_err(StorageError::from)?;
        tracing::info!(
            target: "audit",
            product_id = %product_id,
            quantity = level.quantity,
            expires_on = ?level.expires_on,
            "Stock level set"
        );
        Ok(())
    }

    // ========== Public Query Methods ==========

    pub fn get_session(&self, order_id: &str) -> ManagerResult<Option<PackingSession>> {
        Ok(self.storage.get_session(order_id)?)
    }

    pub fn get_sessions(&self) -> ManagerResult<Vec<PackingSession>> {
        Ok(self.storage.get_all_sessions()?)
    }

    /// Sessions being packed with no activity since `cutoff` (Unix millis)
    pub fn idle_sessions(&self, cutoff: i64) -> ManagerResult<Vec<PackingSession>> {
        Ok(self.storage.get_idle_sessions(cutoff)?)
    }

    pub fn get_current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Get all events for a specific order
    pub fn get_events_for_order(&self, order_id: &str) -> ManagerResult<Vec<PackingEvent>> {
        Ok(self.storage.get_events_for_order(order_id)?)
    }

    /// Rebuild a session from its events (for verification)
    pub fn rebuild_session(&self, order_id: &str) -> ManagerResult<PackingSession> {
        let events = self.storage.get_events_for_order(order_id)?;
        replay(&events).ok_or_else(|| ManagerError::SessionNotFound(order_id.to_string()))
    }
}

/// Session an event applies to
///
/// Only `SessionOpened` may start from a blank session; any other load
/// failure aborts the command.
fn session_for_event(
    ctx: &CommandContext<'_>,
    event: &PackingEvent,
) -> Result<PackingSession, PackingError> {
    match ctx.load_session(&event.order_id) {
        Err(PackingError::SessionNotFound(_))
            if event.event_type == PackingEventType::SessionOpened =>
        {
            Ok(PackingSession::new(
                event.order_id.clone(),
                NaiveDate::default(),
                vec![],
            ))
        }
        other => other,
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests;
