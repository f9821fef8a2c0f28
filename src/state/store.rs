// src/state/store.rs
use crate::config::Settings;
use crate::miner::inventory::{Channel, DropsCampaign};
use crate::state::journal::{self, ERROR_CAPACITY, JOURNAL_CAPACITY};
use crate::state::models::{
    CampaignSummary, ChannelSummary, JournalEntry, JournalKind, RuntimeState, SettingsSummary,
    Snapshot, isoformat,
};
use crate::types::{ChannelRef, State};
use crate::utils::logging::LogSink;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Value of `system_load` when the host does not report a load average
pub const LOAD_UNAVAILABLE: &str = "n/a";

/// Thread-safe aggregator of settings and runtime state
///
/// The single source of truth read by the control API and the watchdog.
/// Every method takes the one internal lock for its whole read-modify-write,
/// and [`StateStore::get_snapshot`] hands out an owned copy, so readers never
/// see a half-applied update.
pub struct StateStore {
    inner: Mutex<Inner>,
    journal_path: Option<PathBuf>,
    sink: LogSink,
}

struct Inner {
    settings: SettingsSummary,
    runtime: RuntimeState,
    /// Dedupe keys of claims already seen during this store's lifetime
    known_claims: HashSet<String>,
    campaigns_loaded: bool,
}

impl StateStore {
    /// Creates the store, loading any journal persisted at `journal_path`
    ///
    /// # Arguments
    /// * `settings` - Settings to project into snapshots
    /// * `journal_path` - Where the journal lives; `None` keeps it in memory
    /// * `sink` - Log target for persistence diagnostics
    pub fn new(settings: &Settings, journal_path: Option<PathBuf>, sink: LogSink) -> Self {
        let journal = journal_path
            .as_deref()
            .map(journal::load)
            .unwrap_or_default();
        Self {
            inner: Mutex::new(Inner {
                settings: SettingsSummary::from(settings),
                runtime: RuntimeState::new(journal),
                known_claims: HashSet::new(),
                campaigns_loaded: false,
            }),
            journal_path,
            sink,
        }
    }

    /// Where the journal is persisted, if anywhere
    pub fn journal_path(&self) -> Option<&Path> {
        self.journal_path.as_deref()
    }

    // Recovers the guard from a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the settings projection
    pub fn update_settings(&self, settings: &Settings) {
        let summary = SettingsSummary::from(settings);
        self.lock().settings = summary;
    }

    /// Records the client's current phase
    pub fn set_state(&self, state: State) {
        self.lock().runtime.state = state;
    }

    /// Current client phase
    pub fn state(&self) -> State {
        self.lock().runtime.state
    }

    /// Records the watched channel, journaling identity changes
    ///
    /// Identity is the channel login: repeating the same channel (or `None`)
    /// adds nothing to the journal.
    pub fn set_watching(&self, channel: Option<&Channel>) {
        let summary = channel.map(ChannelSummary::from);
        let mut inner = self.lock();
        let previous = inner.runtime.watching.as_ref().map(|w| w.login.clone());
        let current = summary.as_ref().map(|w| w.login.clone());
        let changed = previous != current;
        let message = summary.as_ref().map(|w| format!("Watching {}", w.display_name));
        inner.runtime.watching = summary;
        if changed {
            match message {
                Some(message) => self.journal_locked(&mut inner, JournalKind::Switch, message),
                None => self.journal_locked(
                    &mut inner,
                    JournalKind::Info,
                    "Stopped watching, searching for a channel",
                ),
            }
        }
    }

    /// Replaces the channel list
    pub fn set_channels<'a, I>(&self, channels: I)
    where
        I: IntoIterator<Item = &'a Channel>,
    {
        let summaries: Vec<_> = channels.into_iter().map(ChannelSummary::from).collect();
        self.lock().runtime.channels = summaries;
    }

    /// Replaces the campaign list, journaling newly claimed drops
    ///
    /// The first call after construction only registers claims already on
    /// the account; they predate this run and are not journaled.
    pub fn set_campaigns<'a, I>(&self, campaigns: I)
    where
        I: IntoIterator<Item = &'a DropsCampaign>,
    {
        let campaigns: Vec<&DropsCampaign> = campaigns.into_iter().collect();
        let summaries: Vec<_> = campaigns.iter().map(|c| CampaignSummary::from(*c)).collect();

        let mut inner = self.lock();
        let seeding = !inner.campaigns_loaded;
        for campaign in &campaigns {
            for drop in campaign.drops.iter().filter(|d| d.is_claimed) {
                let key = claim_key(&drop.name, &campaign.game);
                if !inner.known_claims.insert(key) || seeding {
                    continue;
                }
                let message = format!("Claimed {} ({})", drop.name, campaign.game);
                self.journal_locked(&mut inner, JournalKind::Claim, message);
            }
        }
        inner.runtime.campaigns = summaries;
        inner.campaigns_loaded = true;
    }

    /// Records the last reload trigger; `None` means now
    pub fn set_last_reload(&self, when: Option<DateTime<Utc>>) {
        let stamp = isoformat(&when.unwrap_or_else(Utc::now));
        self.lock().runtime.last_reload = Some(stamp);
    }

    /// Records (or clears) the pending channel switch request
    pub fn set_pending_switch(&self, requested: Option<ChannelRef>) {
        self.lock().runtime.pending_switch = requested;
    }

    /// Reads and clears the pending switch request in one step
    pub fn take_pending_switch(&self) -> Option<ChannelRef> {
        self.lock().runtime.pending_switch.take()
    }

    /// Appends to the error log and journals the message
    pub fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        let mut inner = self.lock();
        journal::append_bounded(&mut inner.runtime.errors, message.clone(), ERROR_CAPACITY);
        self.journal_locked(&mut inner, JournalKind::Error, message);
    }

    /// Owned copy of settings and runtime state
    ///
    /// Also refreshes the best-effort `system_load` field.
    pub fn get_snapshot(&self) -> Snapshot {
        let mut inner = self.lock();
        inner.runtime.system_load = system_load();
        Snapshot {
            settings: inner.settings.clone(),
            runtime: inner.runtime.clone(),
        }
    }

    fn journal_locked(&self, inner: &mut Inner, kind: JournalKind, message: impl Into<String>) {
        let entry = JournalEntry::now(kind, message);
        journal::prepend_bounded(&mut inner.runtime.journal, entry, JOURNAL_CAPACITY);
        if let Some(path) = &self.journal_path {
            if let Err(e) = journal::persist(path, &inner.runtime.journal) {
                log::debug!(target: self.sink.target(), "Journal not persisted: {}", e);
            }
        }
    }
}

/// Identity of a claimed drop for journal dedupe
pub fn claim_key(drop_name: &str, game: &str) -> String {
    format!("{}::{}", drop_name, game)
}

#[cfg(unix)]
fn system_load() -> String {
    let load = sysinfo::System::load_average();
    format!("{:.2} {:.2} {:.2}", load.one, load.five, load.fifteen)
}

#[cfg(not(unix))]
fn system_load() -> String {
    LOAD_UNAVAILABLE.to_string()
}
