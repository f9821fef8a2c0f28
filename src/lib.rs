//! Drops Miner - control plane for a drops mining client
//!
//! This crate keeps a platform client running and observable:
//! - A lifecycle service that starts, stops, reloads and redirects the client
//! - A state store aggregating everything the client reports, with a
//!   persisted activity journal
//! - A watchdog that reloads a stale inventory with anti-flap hysteresis
//! - An optional JSON control API

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// HTTP control API
pub mod api;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Presentation callbacks and the headless presenter
pub mod gui;

/// Miner core: client interface, lifecycle service and watchdog
pub mod miner;

/// Shared runtime state and the activity journal
pub mod state;

/// Shared type definitions
pub mod types;

/// Utility functions and error handling
pub mod utils;

// Core exports
pub use api::{AuthConfig, WebApi};
pub use cli::Commands;
pub use config::{Settings, SharedSettings};
pub use miner::{MinerClient, MinerService, ReloadOutcome, StandbyClient, Watchdog};
pub use state::{Snapshot, StateStore};
pub use types::{ChannelRef, PriorityMode, State};
pub use utils::{LogSink, MinerError, init_logging};
