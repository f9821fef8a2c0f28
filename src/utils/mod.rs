// src/utils/mod.rs
//! Utilities module for common functionality
//!
//! This module contains shared utilities used throughout the drops miner,
//! including error handling and logging infrastructure.

/// Error types and handling utilities
///
/// Contains the [`MinerError`] enum which defines all possible error conditions
/// for the drops miner, along with conversion implementations.
pub mod error;

/// Logging configuration and utilities
///
/// Provides logging initialization and the [`LogSink`] handles components
/// log through.
pub mod logging;

// Re-export for easier access
pub use error::MinerError;
pub use logging::{LogOptions, LogSink, init_logging};
