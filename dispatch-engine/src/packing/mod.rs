//! Packing state machine (event sourced)
//!
//! Every packer action is a [`PackingCommand`](shared::packing::PackingCommand)
//! processed by [`PackingManager`]: handlers in [`actions`] validate it and
//! emit events, appliers in [`appliers`] fold those events into the stored
//! [`PackingSession`](shared::packing::PackingSession). Events, session and
//! stock movements commit in one redb transaction.
//!
//! ```text
//! CONFIRMED ──start──▶ PACKING ──mark ready──▶ READY_FOR_DELIVERY
//!     ▲                 │  ▲ pause/resume           │
//!     └────reset────────┘  └─────────reset──────────┘
//! ```

pub mod traits;

pub mod actions;
pub mod appliers;
pub mod manager;
pub mod pin;
pub mod stock;
pub mod storage;

#[cfg(test)]
mod testing;

pub use manager::{ManagerError, ManagerResult, PackingManager};
pub use pin::{HashedPinPolicy, NoPinPolicy, PinCheck, PinPolicy, hash_pin};
pub use storage::{PackingStorage, PackingStorageStats, StorageError};
pub use traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier, PackingError};
