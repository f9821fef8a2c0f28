use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Phase the mining client is currently in
///
/// Names are reported verbatim (`INVENTORY_FETCH`, ...) in snapshots and
/// watchdog status lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    /// Waiting for the next scheduled refresh
    Idle,
    /// Refreshing the drops inventory (campaigns and progress)
    InventoryFetch,
    /// Recomputing the set of wanted games
    GamesUpdate,
    /// Fetching live channels for the wanted games
    ChannelsFetch,
    /// Dropping channels that are no longer relevant
    ChannelsCleanup,
    /// Choosing a channel to watch
    ChannelSwitch,
    /// Terminal phase; the client is shutting down or has not started
    Exit,
}

impl State {
    /// Upper-case name as shown to controllers
    pub fn name(&self) -> &'static str {
        match self {
            State::Idle => "IDLE",
            State::InventoryFetch => "INVENTORY_FETCH",
            State::GamesUpdate => "GAMES_UPDATE",
            State::ChannelsFetch => "CHANNELS_FETCH",
            State::ChannelsCleanup => "CHANNELS_CLEANUP",
            State::ChannelSwitch => "CHANNEL_SWITCH",
            State::Exit => "EXIT",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How candidate campaigns are ordered when picking what to mine
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityMode {
    /// Only mine games on the priority list
    PriorityOnly,

    /// Prefer campaigns that end first
    EndingSoonest,

    /// Prefer games with the fewest available channels
    #[serde(rename = "LOW_AVBL_FIRST")]
    LowAvailabilityFirst,
}

impl fmt::Display for PriorityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityMode::PriorityOnly => write!(f, "PRIORITY_ONLY"),
            PriorityMode::EndingSoonest => write!(f, "ENDING_SOONEST"),
            PriorityMode::LowAvailabilityFirst => write!(f, "LOW_AVBL_FIRST"),
        }
    }
}

impl FromStr for PriorityMode {
    type Err = String;

    /// Parses the exact enum name, as the settings endpoint expects
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRIORITY_ONLY" => Ok(PriorityMode::PriorityOnly),
            "ENDING_SOONEST" => Ok(PriorityMode::EndingSoonest),
            "LOW_AVBL_FIRST" => Ok(PriorityMode::LowAvailabilityFirst),
            _ => Err(format!("Unknown priority mode: {}", s)),
        }
    }
}

/// Operator request naming a channel to switch to
///
/// Serialized untagged, so `12345` and `"login"` both round-trip through the
/// control API unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelRef {
    /// Channel ID
    Id(u64),
    /// Channel login or display name
    Login(String),
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRef::Id(id) => write!(f, "{}", id),
            ChannelRef::Login(login) => f.write_str(login),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_are_screaming_snake() {
        assert_eq!(State::InventoryFetch.to_string(), "INVENTORY_FETCH");
        assert_eq!(
            serde_json::to_value(State::ChannelSwitch).unwrap(),
            serde_json::json!("CHANNEL_SWITCH")
        );
    }

    #[test]
    fn priority_mode_parses_exact_names_only() {
        assert_eq!(
            "LOW_AVBL_FIRST".parse::<PriorityMode>(),
            Ok(PriorityMode::LowAvailabilityFirst)
        );
        assert!("priority_only".parse::<PriorityMode>().is_err());
        assert_eq!(PriorityMode::EndingSoonest.to_string(), "ENDING_SOONEST");
    }

    #[test]
    fn channel_ref_is_untagged() {
        let id: ChannelRef = serde_json::from_str("12345").unwrap();
        assert_eq!(id, ChannelRef::Id(12345));
        let login: ChannelRef = serde_json::from_str("\"foo\"").unwrap();
        assert_eq!(login, ChannelRef::Login("foo".into()));
    }
}
