// src/config/mod.rs
//! Configuration management for the drops miner
//!
//! This module handles all configuration-related functionality including:
//! - Loading and parsing the TOML settings file
//! - Overlaying command-line flags into one merged [`Settings`] value
//! - Validating and persisting changes made through the control API

/// Core settings implementation
///
/// Contains the [`Settings`] struct, the persisted [`SettingsFile`] and the
/// [`SettingsUpdate`] setter path.
pub mod settings;

// Re-export key items for easy access
pub use settings::{RuntimeArgs, Settings, SettingsFile, SettingsUpdate, SharedSettings};

use crate::cli::Commands;
use crate::utils::error::MinerError;

/// Loads settings for a parsed command line
///
/// # Arguments
/// * `cmd` - Parsed command-line flags
///
/// # Returns
/// * `Ok(Settings)` - Flags merged over the settings file (or defaults)
/// * `Err(MinerError)` - If the settings file exists but is unreadable
pub fn load(cmd: &Commands) -> Result<Settings, MinerError> {
    Settings::load(RuntimeArgs::from_commands(cmd))
}
