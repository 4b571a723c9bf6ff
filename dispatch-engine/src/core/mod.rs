//! Core engine plumbing: configuration

pub mod config;

pub use config::{Config, PackingConfig, SequencerConfig};
