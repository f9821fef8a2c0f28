// src/miner/standby.rs
//! Stand-in platform client
//!
//! Runs the phase loop a real platform client would run, without talking to
//! any platform: inventory refreshes are stamped on schedule, switch requests
//! are consumed and resolved against an (initially empty) channel set, and
//! everything is published into the state store. Used when no platform
//! backend is compiled in, and as the reference for writing one.

use crate::config::SharedSettings;
use crate::gui::{HeadlessGui, Presenter};
use crate::miner::client::{ClientContext, ClientFactory, MinerClient};
use crate::miner::inventory::Channel;
use crate::types::State;
use crate::utils::error::MinerError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// Inventory refresh interval reported when none is configured
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(900);

/// Client that keeps the state machine alive without a platform connection
pub struct StandbyClient {
    /// Shared settings, persisted on save
    settings: SharedSettings,
    /// Surroundings handed over by the service
    ctx: ClientContext,
    /// Log-backed presenter
    gui: Arc<HeadlessGui>,
    /// Requested phase, consumed by the run loop
    phase: watch::Sender<State>,
    /// Known channels keyed by ID
    channels: Mutex<BTreeMap<u64, Channel>>,
    /// Set once close was requested
    closed: AtomicBool,
    /// True while `run` executes
    running: AtomicBool,
    /// Time between scheduled inventory refreshes
    interval: Duration,
}

impl StandbyClient {
    /// Creates a client refreshing every [`DEFAULT_REFRESH_INTERVAL`]
    pub fn new(ctx: ClientContext) -> Self {
        Self::with_interval(ctx, DEFAULT_REFRESH_INTERVAL)
    }

    /// Creates a client refreshing every `interval`
    pub fn with_interval(ctx: ClientContext, interval: Duration) -> Self {
        let (phase, _) = watch::channel(State::InventoryFetch);
        Self {
            settings: ctx.settings.clone(),
            gui: Arc::new(HeadlessGui::new(ctx.sink)),
            ctx,
            phase,
            channels: Mutex::new(BTreeMap::new()),
            closed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            interval,
        }
    }

    /// Factory building standby clients for the service
    pub fn factory() -> ClientFactory {
        Box::new(|ctx: ClientContext| -> Arc<dyn MinerClient> {
            Arc::new(StandbyClient::new(ctx))
        })
    }

    /// Replaces the known channel set and publishes it
    pub fn set_channels(&self, channels: impl IntoIterator<Item = Channel>) {
        let mut known = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        *known = channels.into_iter().map(|c| (c.id, c)).collect();
        self.ctx.state_store.set_channels(known.values());
    }

    fn handle(&self, state: State) {
        let store = &self.ctx.state_store;
        store.set_state(state);
        match state {
            State::InventoryFetch => {
                log::debug!(target: self.ctx.sink.target(), "Refreshing inventory");
                store.set_last_reload(None);
            }
            State::ChannelSwitch => {
                let picked = self
                    .ctx
                    .service
                    .upgrade()
                    .and_then(|service| service.consume_switch_request());
                match &picked {
                    Some(channel) => {
                        log::info!(target: self.ctx.sink.target(), "Watching {}", channel.display_name)
                    }
                    None => {
                        log::debug!(target: self.ctx.sink.target(), "No channel selected")
                    }
                }
                store.set_watching(picked.as_ref());
            }
            _ => {}
        }
        if state != State::Exit {
            store.set_state(State::Idle);
            self.gui.update_status("Idle");
        }
    }
}

#[async_trait]
impl MinerClient for StandbyClient {
    async fn run(&self) -> Result<i32, MinerError> {
        self.running.store(true, Ordering::SeqCst);
        let mut rx = self.phase.subscribe();
        rx.mark_changed();
        while !self.closed.load(Ordering::SeqCst) {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *rx.borrow_and_update();
                    if state == State::Exit {
                        break;
                    }
                    self.handle(state);
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.phase.send_replace(State::InventoryFetch);
                }
            }
        }
        self.ctx.state_store.set_state(State::Exit);
        self.running.store(false, Ordering::SeqCst);
        Ok(0)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.phase.send_replace(State::Exit);
    }

    fn change_state(&self, state: State) {
        if !self.closed.load(Ordering::SeqCst) {
            self.phase.send_replace(state);
        }
    }

    fn expected_refresh_interval(&self) -> Duration {
        self.interval
    }

    fn channels(&self) -> BTreeMap<u64, Channel> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn gui(&self) -> Arc<dyn Presenter> {
        self.gui.clone()
    }

    fn save(&self, force: bool) {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = settings.save(force) {
            log::warn!(target: self.ctx.sink.target(), "Settings not saved: {}", e);
        }
    }
}
