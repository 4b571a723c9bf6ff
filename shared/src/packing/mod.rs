//! Packing Event Sourcing Module
//!
//! This module provides types for the warehouse packing state machine:
//! - Commands: Requests from packers to mutate one order's packing state
//! - Events: Immutable facts recorded after command processing (audit trail)
//! - Sessions: Computed packing state from the event stream

pub mod command;
pub mod event;
pub mod session;
pub mod types;

// Re-exports
pub use command::{PackingCommand, PackingCommandPayload};
pub use event::{PackingEvent, PackingEventPayload, PackingEventType};
pub use session::{PackingItem, PackingSession, PackingStatus};
pub use types::*;
