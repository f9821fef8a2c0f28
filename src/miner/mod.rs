// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains all components related to the mining process:
//! - The platform client interface and its stand-in implementation
//! - The lifecycle service owning the client's task
//! - The watchdog that reloads a stale inventory

/// Platform client interface
///
/// Defines the [`MinerClient`] trait the service drives and the factory
/// used to build clients on demand.
pub mod client;

/// Channel and campaign values reported by clients
pub mod inventory;

/// Lifecycle controller
///
/// Contains [`MinerService`], which starts, stops, reloads and redirects the
/// client and turns its outcome into an exit status.
pub mod service;

/// Client used when no platform backend is available
pub mod standby;

/// Stale-inventory watchdog
///
/// Periodically compares the last reload time against the client's refresh
/// interval and requests a reload after two stale observations in a row.
pub mod watchdog;

// Re-export main components for cleaner imports
pub use self::client::{ClientContext, ClientFactory, MinerClient};
pub use self::inventory::{Channel, DropsCampaign, TimedDrop};
pub use self::service::{Lifecycle, MinerService, ReloadOutcome};
pub use self::standby::StandbyClient;
pub use self::watchdog::{Supervised, Watchdog, WatchdogHandle};
