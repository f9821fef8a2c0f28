// src/miner/client.rs
//! Platform client interface
//!
//! The service never talks to the streaming platform itself. It drives a
//! [`MinerClient`], created on demand by a [`ClientFactory`], and reads back
//! what the client publishes into the [`StateStore`].

use crate::config::SharedSettings;
use crate::gui::Presenter;
use crate::miner::inventory::Channel;
use crate::miner::service::MinerService;
use crate::state::StateStore;
use crate::types::State;
use crate::utils::{error::MinerError, logging::LogSink};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Contract between the service and a platform client
///
/// Implementations are expected to publish their phase, channels, campaigns
/// and watched channel into the state store they were constructed with, and
/// to pull operator switch requests through
/// [`MinerService::consume_switch_request`].
#[async_trait]
pub trait MinerClient: Send + Sync {
    /// Runs until closed or until a fatal error
    ///
    /// # Returns
    /// - `Ok(status)` - Process exit status, 0 on graceful close
    /// - `Err(MinerError::AuthChallenge)` - The platform wants a captcha
    /// - `Err(_)` - Any other fatal fault
    async fn run(&self) -> Result<i32, MinerError>;

    /// Requests shutdown; idempotent and non-blocking
    fn close(&self);

    /// Moves the client to another phase without restarting it
    fn change_state(&self, state: State);

    /// How often the client refreshes its inventory when healthy
    fn expected_refresh_interval(&self) -> Duration;

    /// Live channels keyed by channel ID
    fn channels(&self) -> BTreeMap<u64, Channel>;

    /// True while [`MinerClient::run`] is executing
    fn is_running(&self) -> bool;

    /// Presenter used for operator-facing output
    fn gui(&self) -> Arc<dyn Presenter>;

    /// Persists client-owned settings; `force` writes even when unchanged
    fn save(&self, force: bool);

    /// Releases connections after `run` returned
    async fn shutdown(&self) {}
}

/// Everything a client needs from its surroundings
#[derive(Clone)]
pub struct ClientContext {
    /// Shared settings
    pub settings: SharedSettings,
    /// Store to publish state into
    pub state_store: Arc<StateStore>,
    /// Owning service, for pulling switch requests
    pub service: Weak<MinerService>,
    /// Log target for client output
    pub sink: LogSink,
}

/// Builds the client the first time the service needs one
///
/// Called with the service's client slot locked, so it must not call back
/// into the service synchronously.
pub type ClientFactory = Box<dyn Fn(ClientContext) -> Arc<dyn MinerClient> + Send + Sync>;
