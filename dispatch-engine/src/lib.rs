//! Dispatch Engine - daily packing and delivery operations for a distributor
//!
//! # Overview
//!
//! - **Routing** (`routing`): orders a day's stops into a near-shortest tour
//!   from the depot, splits the tour per driver, persists route snapshots
//!   and decides when a plan is stale
//! - **Packing** (`packing`): event-sourced per-order packing state machine
//!   with stock consumption, PIN-gated quantity edits and idempotent,
//!   version-checked commands
//!
//! # Layout
//!
//! ```text
//! dispatch-engine/src/
//! ├── core/          # Configuration
//! ├── utils/         # Logging
//! ├── routing/       # Sequencer, allocator, gate, planner, route storage
//! └── packing/       # Commands, appliers, manager, packing storage
//! ```

pub mod core;
pub mod packing;
pub mod routing;
pub mod utils;

// Re-export public types
pub use core::{Config, PackingConfig, SequencerConfig};
pub use packing::{PackingManager, PackingStorage};
pub use routing::{
    Allocation, DeliveryPlanner, GeoRouter, RecalculationGate, RouteSequencer, RouteStorage,
    StraightLineRouter,
};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};
