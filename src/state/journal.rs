// src/state/journal.rs
//! Bounded buffers and on-disk persistence for the activity journal

use crate::state::models::JournalEntry;
use crate::utils::error::MinerError;
use std::collections::VecDeque;
use std::path::Path;

/// Maximum number of journal entries kept (newest first)
pub const JOURNAL_CAPACITY: usize = 100;

/// Maximum number of recorded errors kept (oldest first)
pub const ERROR_CAPACITY: usize = 10;

/// Prepends `entry`, evicting the oldest entries beyond capacity
pub fn prepend_bounded<T>(buf: &mut VecDeque<T>, entry: T, capacity: usize) {
    buf.push_front(entry);
    buf.truncate(capacity);
}

/// Appends `entry`, evicting from the front beyond capacity
pub fn append_bounded<T>(buf: &mut VecDeque<T>, entry: T, capacity: usize) {
    buf.push_back(entry);
    while buf.len() > capacity {
        buf.pop_front();
    }
}

/// Loads a persisted journal
///
/// A missing, unreadable or malformed file yields an empty journal; startup
/// never fails because of it.
pub fn load(path: &Path) -> VecDeque<JournalEntry> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return VecDeque::new();
    };
    match serde_json::from_str::<VecDeque<JournalEntry>>(&content) {
        Ok(mut entries) => {
            entries.truncate(JOURNAL_CAPACITY);
            entries
        }
        Err(_) => VecDeque::new(),
    }
}

/// Writes the journal as a JSON array, creating the parent directory
///
/// # Errors
/// Returns `MinerError` on serialization or I/O failure. Callers treat this
/// as a durability loss only.
pub fn persist(path: &Path, entries: &VecDeque<JournalEntry>) -> Result<(), MinerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, content)?;
    Ok(())
}
