//! Shared types for the dispatch workspace
//!
//! Types used by the dispatch engine and by any consumer of its results
//! (packing/delivery UI, order store adapters):
//!
//! - `delivery`: stops, route snapshots, sequence fields and staleness fingerprints
//! - `packing`: packing commands, events, session snapshots and command responses

pub mod delivery;
pub mod packing;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
