// src/cli/mod.rs
//! Command-line interface definitions

/// Flags accepted by the daemon binary
pub mod commands;

pub use commands::Commands;
