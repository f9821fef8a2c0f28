// src/miner/inventory.rs
//! Channel and campaign data reported by the platform client
//!
//! These are plain values: the client builds them from whatever the platform
//! returns and hands them to the state store, which projects them into
//! snapshot summaries.

use chrono::{DateTime, Utc};

/// A live channel known to the client
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Platform channel ID
    pub id: u64,
    /// Lower-case login, the channel's stable identity
    pub login: String,
    /// Display name as shown on the platform
    pub display_name: String,
    /// Currently streaming
    pub online: bool,
    /// Announced online but not confirmed yet
    pub pending_online: bool,
    /// Game being streamed, if any
    pub game: Option<String>,
    /// Current viewer count
    pub viewers: u32,
    /// Channel has drops enabled
    pub drops_enabled: bool,
    /// Channel was taken from a campaign allow-list
    pub acl_based: bool,
}

impl Channel {
    /// Creates an offline channel with no game
    pub fn new(id: u64, login: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
            display_name: display_name.into(),
            online: false,
            pending_online: false,
            game: None,
            viewers: 0,
            drops_enabled: false,
            acl_based: false,
        }
    }
}

/// A single timed drop inside a campaign
#[derive(Debug, Clone, PartialEq)]
pub struct TimedDrop {
    /// Platform drop ID
    pub id: String,
    /// Reward name
    pub name: String,
    /// Minutes watched so far
    pub current_minutes: u32,
    /// Minutes needed to earn the drop
    pub required_minutes: u32,
    /// Reward already claimed
    pub is_claimed: bool,
    /// Reward earned and claimable now
    pub can_claim: bool,
    /// Start of the drop window
    pub starts_at: DateTime<Utc>,
    /// End of the drop window
    pub ends_at: DateTime<Utc>,
}

impl TimedDrop {
    /// Fraction of required minutes watched, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.is_claimed {
            return 1.0;
        }
        if self.required_minutes == 0 {
            return 0.0;
        }
        (f64::from(self.current_minutes) / f64::from(self.required_minutes)).min(1.0)
    }
}

/// A drops campaign for one game
#[derive(Debug, Clone, PartialEq)]
pub struct DropsCampaign {
    /// Platform campaign ID
    pub id: String,
    /// Campaign title
    pub name: String,
    /// Game the campaign belongs to
    pub game: String,
    /// Account is linked and eligible
    pub eligible: bool,
    /// Campaign window is open
    pub active: bool,
    /// Campaign has not started yet
    pub upcoming: bool,
    /// Campaign window start
    pub starts_at: DateTime<Utc>,
    /// Campaign window end
    pub ends_at: DateTime<Utc>,
    /// Drops in claim order
    pub drops: Vec<TimedDrop>,
}

impl DropsCampaign {
    /// Number of drops already claimed
    pub fn claimed_drops(&self) -> usize {
        self.drops.iter().filter(|d| d.is_claimed).count()
    }

    /// Total number of drops
    pub fn total_drops(&self) -> usize {
        self.drops.len()
    }

    /// Mean progress over all drops
    pub fn progress(&self) -> f64 {
        if self.drops.is_empty() {
            return 0.0;
        }
        self.drops.iter().map(TimedDrop::progress).sum::<f64>() / self.drops.len() as f64
    }
}
