// src/state/mod.rs
//! Shared runtime state
//!
//! This module holds the one piece of shared mutable state in the miner:
//! - The [`StateStore`] aggregating settings, client phase, channels,
//!   campaigns, errors and the activity journal
//! - The serializable snapshot models handed to controllers
//! - Journal persistence
//!

/// Bounded buffers and journal persistence
pub mod journal;

/// Snapshot and summary types
pub mod models;

/// The lock-protected state aggregator
pub mod store;

// Re-export main components
pub use models::{JournalEntry, JournalKind, RuntimeState, SettingsSummary, Snapshot};
pub use store::StateStore;
