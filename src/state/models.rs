// src/state/models.rs
use crate::config::Settings;
use crate::miner::inventory::{Channel, DropsCampaign, TimedDrop};
use crate::types::{ChannelRef, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Formats a timestamp the way every snapshot field carries it
pub fn isoformat(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Streaming status of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Live
    Online,
    /// Announced live, not confirmed
    PendingOnline,
    /// Not streaming
    Offline,
}

/// Channel as shown to controllers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    /// Platform channel ID
    pub id: u64,
    /// Login (identity)
    pub login: String,
    /// Display name
    pub display_name: String,
    /// Streaming status
    pub status: ChannelStatus,
    /// Game being streamed
    pub game: Option<String>,
    /// Viewer count
    pub viewers: u32,
    /// Drops enabled on the channel
    pub drops_enabled: bool,
    /// Channel came from a campaign allow-list
    pub acl_based: bool,
}

impl From<&Channel> for ChannelSummary {
    fn from(channel: &Channel) -> Self {
        let status = if channel.online {
            ChannelStatus::Online
        } else if channel.pending_online {
            ChannelStatus::PendingOnline
        } else {
            ChannelStatus::Offline
        };
        Self {
            id: channel.id,
            login: channel.login.clone(),
            display_name: channel.display_name.clone(),
            status,
            game: channel.game.clone(),
            viewers: channel.viewers,
            drops_enabled: channel.drops_enabled,
            acl_based: channel.acl_based,
        }
    }
}

/// Drop as shown to controllers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropSummary {
    /// Platform drop ID
    pub id: String,
    /// Reward name
    pub name: String,
    /// Fraction watched, in `[0, 1]`
    pub progress: f64,
    /// Already claimed
    pub claimed: bool,
    /// Claimable now
    pub can_claim: bool,
    /// Minutes watched
    pub current_minutes: u32,
    /// Minutes required
    pub required_minutes: u32,
    /// RFC 3339 start
    pub starts_at: String,
    /// RFC 3339 end
    pub ends_at: String,
}

impl From<&TimedDrop> for DropSummary {
    fn from(drop: &TimedDrop) -> Self {
        Self {
            id: drop.id.clone(),
            name: drop.name.clone(),
            progress: drop.progress(),
            claimed: drop.is_claimed,
            can_claim: drop.can_claim,
            current_minutes: drop.current_minutes,
            required_minutes: drop.required_minutes,
            starts_at: isoformat(&drop.starts_at),
            ends_at: isoformat(&drop.ends_at),
        }
    }
}

/// Campaign as shown to controllers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    /// Platform campaign ID
    pub id: String,
    /// Campaign name
    pub name: String,
    /// Game the campaign belongs to
    pub game: String,
    /// Account can earn drops from it
    pub eligible: bool,
    /// Running now
    pub active: bool,
    /// Not started yet
    pub upcoming: bool,
    /// Mean drop progress
    pub progress: f64,
    /// Drops already claimed
    pub claimed_drops: usize,
    /// Drops in the campaign
    pub total_drops: usize,
    /// RFC 3339 start
    pub starts_at: String,
    /// RFC 3339 end
    pub ends_at: String,
    /// Per-drop detail
    pub drops: Vec<DropSummary>,
}

impl From<&DropsCampaign> for CampaignSummary {
    fn from(campaign: &DropsCampaign) -> Self {
        Self {
            id: campaign.id.clone(),
            name: campaign.name.clone(),
            game: campaign.game.clone(),
            eligible: campaign.eligible,
            active: campaign.active,
            upcoming: campaign.upcoming,
            progress: campaign.progress(),
            claimed_drops: campaign.claimed_drops(),
            total_drops: campaign.total_drops(),
            starts_at: isoformat(&campaign.starts_at),
            ends_at: isoformat(&campaign.ends_at),
            drops: campaign.drops.iter().map(DropSummary::from).collect(),
        }
    }
}

/// Kind of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalKind {
    /// Started watching a channel
    Switch,
    /// Informational (stopped watching, searching)
    Info,
    /// A drop was claimed
    Claim,
    /// An error was recorded
    Error,
}

impl JournalKind {
    /// Icon hint for front-ends
    pub fn icon(&self) -> &'static str {
        match self {
            JournalKind::Switch => "channel",
            JournalKind::Info => "info",
            JournalKind::Claim => "gift",
            JournalKind::Error => "alert",
        }
    }
}

/// One line of the activity journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// RFC 3339 UTC time of the event
    pub time: String,
    /// Entry category
    pub kind: JournalKind,
    /// Operator-facing text
    pub message: String,
    /// Icon hint matching `kind`
    pub icon: String,
}

impl JournalEntry {
    /// Creates an entry stamped with the current time
    pub fn now(kind: JournalKind, message: impl Into<String>) -> Self {
        Self {
            time: isoformat(&Utc::now()),
            kind,
            message: message.into(),
            icon: kind.icon().to_string(),
        }
    }
}

/// Projection of the current settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSummary {
    /// Interface language
    pub language: String,
    /// Proxy URL, empty when unset
    pub proxy: String,
    /// Games to mine first, in order
    pub priority: Vec<String>,
    /// Sorted
    pub exclude: Vec<String>,
    /// Campaign ordering mode name
    pub priority_mode: String,
    /// Availability checks enabled
    pub available_drops_check: bool,
    /// Badge/emote drops enabled
    pub enable_badges_emotes: bool,
    /// Connection quality setting
    pub connection_quality: u32,
    /// Tray notifications enabled
    pub tray_notifications: bool,
    /// Start minimized to tray
    pub autostart_tray: bool,
}

impl From<&Settings> for SettingsSummary {
    fn from(settings: &Settings) -> Self {
        let file = settings.file();
        Self {
            language: file.language.clone(),
            proxy: file.proxy.clone(),
            priority: file.priority.clone(),
            exclude: file.exclude.iter().cloned().collect(),
            priority_mode: file.priority_mode.to_string(),
            available_drops_check: file.available_drops_check,
            enable_badges_emotes: file.enable_badges_emotes,
            connection_quality: file.connection_quality,
            tray_notifications: file.tray_notifications,
            autostart_tray: file.autostart_tray,
        }
    }
}

/// Mutable runtime record owned by the state store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    /// Current client phase
    pub state: State,
    /// Channel being watched
    pub watching: Option<ChannelSummary>,
    /// Known channels
    pub channels: Vec<ChannelSummary>,
    /// Known campaigns
    pub campaigns: Vec<CampaignSummary>,
    /// RFC 3339 time of the last reload trigger
    pub last_reload: Option<String>,
    /// Oldest first, at most 10
    pub errors: VecDeque<String>,
    /// Newest first, at most 100
    pub journal: VecDeque<JournalEntry>,
    /// Operator switch request not yet consumed
    pub pending_switch: Option<ChannelRef>,
    /// RFC 3339 creation time of the store
    pub started_at: String,
    /// Host load average, or a sentinel when unavailable
    pub system_load: String,
}

impl RuntimeState {
    /// Fresh record for a store created now
    pub fn new(journal: VecDeque<JournalEntry>) -> Self {
        Self {
            state: State::Exit,
            watching: None,
            channels: Vec::new(),
            campaigns: Vec::new(),
            last_reload: None,
            errors: VecDeque::new(),
            journal,
            pending_switch: None,
            started_at: isoformat(&Utc::now()),
            system_load: super::store::LOAD_UNAVAILABLE.to_string(),
        }
    }
}

/// Point-in-time copy of settings and runtime state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Settings projection
    pub settings: SettingsSummary,
    /// Runtime record
    pub runtime: RuntimeState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_status_prefers_online() {
        let mut channel = Channel::new(1, "foo", "Foo");
        assert_eq!(ChannelSummary::from(&channel).status, ChannelStatus::Offline);
        channel.pending_online = true;
        assert_eq!(
            ChannelSummary::from(&channel).status,
            ChannelStatus::PendingOnline
        );
        channel.online = true;
        assert_eq!(ChannelSummary::from(&channel).status, ChannelStatus::Online);
    }

    #[test]
    fn journal_entries_serialize_lowercase_kinds() {
        let entry = JournalEntry::now(JournalKind::Claim, "Claimed");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["kind"], "claim");
        assert_eq!(value["icon"], "gift");
    }
}
