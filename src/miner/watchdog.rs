// src/miner/watchdog.rs
//! Stale-inventory watchdog
//!
//! Polls the state store and asks the service for a reload once the client
//! has gone too long without refreshing its inventory. Two consecutive stale
//! observations are required before acting, so a single slow refresh does
//! not force a restart.

use crate::state::StateStore;
use crate::types::State;
use crate::utils::{error::MinerError, logging::LogSink};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Shortest polling interval
pub const MIN_INTERVAL: Duration = Duration::from_secs(60);
/// Longest polling interval
pub const MAX_INTERVAL: Duration = Duration::from_secs(300);
/// Minimum slack added to the expected refresh interval
pub const MIN_GRACE: Duration = Duration::from_secs(300);
/// Consecutive stale observations that trigger a reload
pub const RELOAD_AFTER: u32 = 2;

/// What the watchdog needs from the thing it supervises
pub trait Supervised: Send + Sync {
    /// True while the worker task is alive
    fn is_running(&self) -> bool;

    /// How often a healthy worker refreshes its inventory
    fn expected_refresh_interval(&self) -> Duration;

    /// Forces an inventory refresh, even if one appears to be under way
    fn trigger_reload(&self) -> Result<(), MinerError>;
}

/// Polling interval for a given refresh interval
pub fn poll_interval(expected: Duration) -> Duration {
    (expected / 3).clamp(MIN_INTERVAL, MAX_INTERVAL)
}

/// Idle time after which the inventory counts as stale
pub fn stale_threshold(expected: Duration) -> Duration {
    expected + MIN_GRACE.max(expected / 4)
}

/// Parses an RFC 3339 timestamp; timestamps without an offset are UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// One tick's reading of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Worker not running, or exiting
    Inactive,
    /// No usable reload timestamp
    NoTimestamp,
    /// Last reload is recent enough
    WithinThreshold,
    /// Last reload is older than the threshold
    Exceeded,
}

/// What a tick decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing to supervise
    Inactive,
    /// Nothing to measure
    NoTimestamp,
    /// Healthy
    WithinThreshold,
    /// Stale, waiting for confirmation
    Hysteresis,
    /// Stale twice in a row, reload requested
    Reload,
}

impl Action {
    /// Name used in the status line
    pub fn name(&self) -> &'static str {
        match self {
            Action::Inactive => "inactive",
            Action::NoTimestamp => "no_timestamp",
            Action::WithinThreshold => "within_threshold",
            Action::Hysteresis => "hysteresis",
            Action::Reload => "reload",
        }
    }
}

/// Anti-flap state carried between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hysteresis {
    /// No stale observation pending
    #[default]
    Ok,
    /// This many consecutive stale observations so far
    Warn(u32),
}

impl Hysteresis {
    /// Consecutive stale observations
    pub fn consecutive(&self) -> u32 {
        match self {
            Hysteresis::Ok => 0,
            Hysteresis::Warn(n) => *n,
        }
    }

    /// Advances the state machine by one observation
    pub fn observe(self, observation: Observation) -> (Hysteresis, Action) {
        match observation {
            Observation::Inactive => (Hysteresis::Ok, Action::Inactive),
            Observation::NoTimestamp => (Hysteresis::Ok, Action::NoTimestamp),
            Observation::WithinThreshold => (Hysteresis::Ok, Action::WithinThreshold),
            Observation::Exceeded => {
                let count = self.consecutive() + 1;
                if count >= RELOAD_AFTER {
                    (Hysteresis::Ok, Action::Reload)
                } else {
                    (Hysteresis::Warn(count), Action::Hysteresis)
                }
            }
        }
    }
}

/// Everything one tick saw and did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Client phase
    pub state: State,
    /// Time since the last reload, if known
    pub idle: Option<Duration>,
    /// Staleness threshold
    pub threshold: Duration,
    /// Consecutive stale observations, counted before any reset
    pub consecutive: u32,
    /// Decision
    pub action: Action,
}

impl TickReport {
    /// True if this tick saw a stale inventory
    pub fn is_stale(&self) -> bool {
        matches!(self.action, Action::Hysteresis | Action::Reload)
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let idle = match self.idle {
            Some(idle) => format!("{:.2}m", idle.as_secs_f64() / 60.0),
            None => "n/a".to_string(),
        };
        write!(
            f,
            "Watchdog: state={}, idle={}, threshold={:.2}m, consecutive={}, action={}",
            self.state,
            idle,
            self.threshold.as_secs_f64() / 60.0,
            self.consecutive,
            self.action.name()
        )
    }
}

/// Periodic staleness check
pub struct Watchdog {
    store: Arc<StateStore>,
    target: Arc<dyn Supervised>,
    sink: LogSink,
    hysteresis: Hysteresis,
}

impl Watchdog {
    /// Creates a watchdog over `target`, reading `store`
    pub fn new(store: Arc<StateStore>, target: Arc<dyn Supervised>, sink: LogSink) -> Self {
        Self {
            store,
            target,
            sink,
            hysteresis: Hysteresis::Ok,
        }
    }

    /// Current anti-flap state
    pub fn hysteresis(&self) -> Hysteresis {
        self.hysteresis
    }

    /// Runs one check as of `now`
    ///
    /// Logs the status line, records it in the store's error log, and asks
    /// for a reload when the hysteresis says so.
    ///
    /// # Errors
    /// Returns the supervised target's error if the reload request fails
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, MinerError> {
        let snapshot = self.store.get_snapshot();
        let state = snapshot.runtime.state;
        let expected = self.target.expected_refresh_interval();
        let threshold = stale_threshold(expected);
        let active = self.target.is_running() && state != State::Exit;

        let idle = snapshot
            .runtime
            .last_reload
            .as_deref()
            .and_then(parse_timestamp)
            .map(|last| (now - last).to_std().unwrap_or(Duration::ZERO));

        let observation = match (active, idle) {
            (false, _) => Observation::Inactive,
            (true, None) => Observation::NoTimestamp,
            (true, Some(idle)) if idle > threshold => Observation::Exceeded,
            (true, Some(_)) => Observation::WithinThreshold,
        };
        let (next, action) = self.hysteresis.observe(observation);
        let consecutive = match action {
            Action::Reload => RELOAD_AFTER,
            _ => next.consecutive(),
        };
        self.hysteresis = next;

        let report = TickReport {
            state,
            idle,
            threshold,
            consecutive,
            action,
        };
        if report.is_stale() {
            log::warn!(target: self.sink.target(), "{}", report);
        } else {
            log::info!(target: self.sink.target(), "{}", report);
        }
        self.store.record_error(report.to_string());

        if action == Action::Reload {
            self.target.trigger_reload()?;
            log::warn!(target: self.sink.target(), "Inventory stale, reload requested");
        }
        Ok(report)
    }

    /// Spawns the polling loop
    pub fn spawn(mut self) -> WatchdogHandle {
        let task = tokio::spawn(async move {
            loop {
                let interval = poll_interval(self.target.expected_refresh_interval());
                tokio::time::sleep(interval).await;
                if let Err(e) = self.tick(Utc::now()) {
                    log::error!(target: self.sink.target(), "Watchdog failure: {}", e);
                    self.store.record_error(format!("Watchdog failure: {}", e));
                }
            }
        });
        WatchdogHandle { task }
    }
}

/// Handle to a running watchdog loop
pub struct WatchdogHandle {
    task: JoinHandle<()>,
}

impl WatchdogHandle {
    /// Cancels the loop and waits for it to wind down
    pub async fn shutdown(self) {
        self.task.abort();
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                log::error!(target: LogSink::watchdog().target(), "Watchdog task failed: {}", e);
            }
        }
    }
}
