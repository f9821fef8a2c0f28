// src/miner/service.rs
//! Miner lifecycle controller
//!
//! [`MinerService`] owns the platform client and the task running it. It
//! exposes idempotent start/stop/reload/switch operations to the control API
//! and the watchdog, and turns the client's outcome into a process exit
//! status.

use crate::config::{Settings, SharedSettings};
use crate::miner::client::{ClientContext, ClientFactory, MinerClient};
use crate::miner::inventory::Channel;
use crate::miner::watchdog::Supervised;
use crate::state::{Snapshot, StateStore};
use crate::types::{ChannelRef, State};
use crate::utils::{error::MinerError, logging::LogSink};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLockReadGuard, Weak};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

/// Lifecycle phase of the worker task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No worker task, or the last one finished
    Idle,
    /// Worker task alive
    Running,
    /// Close requested, task still finishing
    Stopping,
}

/// Result of a reload request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The client was moved to the inventory refresh phase
    Queued,
    /// The client is already refreshing its inventory
    AlreadyInProgress,
}

type RunFuture = Shared<BoxFuture<'static, i32>>;

/// The worker task, joinable by any number of callers
struct WorkerTask {
    run: RunFuture,
    handle: AbortHandle,
}

impl WorkerTask {
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Centralized controller for the miner lifecycle
///
/// Provides a narrow API that front-ends can use to control the miner
/// without coupling to the platform client.
pub struct MinerService {
    settings: SharedSettings,
    state_store: Arc<StateStore>,
    factory: ClientFactory,
    client: Mutex<Option<Arc<dyn MinerClient>>>,
    task: Mutex<Option<WorkerTask>>,
    stopping: AtomicBool,
    sink: LogSink,
    this: Weak<MinerService>,
}

impl MinerService {
    /// Creates the service and its state store
    ///
    /// The store loads the journal from the data directory named in
    /// `settings`.
    ///
    /// # Arguments
    /// * `settings` - Shared settings
    /// * `factory` - Builds the platform client on first use
    /// * `sink` - Log target for lifecycle messages
    pub fn new(settings: SharedSettings, factory: ClientFactory, sink: LogSink) -> Arc<Self> {
        let state_store = {
            let current = read_settings(&settings);
            Arc::new(StateStore::new(&current, Some(current.journal_path()), sink))
        };
        Arc::new_cyclic(|this| MinerService {
            settings,
            state_store,
            factory,
            client: Mutex::new(None),
            task: Mutex::new(None),
            stopping: AtomicBool::new(false),
            sink,
            this: this.clone(),
        })
    }

    /// Shared settings
    pub fn settings(&self) -> SharedSettings {
        self.settings.clone()
    }

    /// The state store consulted by every front-end
    pub fn state_store(&self) -> Arc<StateStore> {
        self.state_store.clone()
    }

    /// The client, if one was created already
    pub fn client(&self) -> Option<Arc<dyn MinerClient>> {
        lock(&self.client).clone()
    }

    fn ensure_client(&self) -> Arc<dyn MinerClient> {
        let mut slot = lock(&self.client);
        if let Some(client) = slot.as_ref() {
            return client.clone();
        }
        let client = (self.factory)(ClientContext {
            settings: self.settings.clone(),
            state_store: self.state_store.clone(),
            service: self.this.clone(),
            sink: LogSink::watch(),
        });
        *slot = Some(client.clone());
        client
    }

    /// Starts the miner and waits for its exit status
    ///
    /// If a worker task is already running this joins it instead of
    /// starting another, so concurrent callers all observe the same single
    /// execution and receive the same status.
    pub async fn start(&self) -> i32 {
        let (_, run) = self.spawn_if_idle();
        run.await
    }

    /// Starts the miner without waiting
    ///
    /// # Returns
    /// `true` if a new worker task was spawned, `false` if one was running
    pub fn ensure_started(&self) -> bool {
        self.spawn_if_idle().0
    }

    fn spawn_if_idle(&self) -> (bool, RunFuture) {
        let mut task = lock(&self.task);
        if let Some(current) = task.as_ref() {
            if !current.is_finished() {
                return (false, current.run.clone());
            }
            // A finished client stays closed; the next run gets a fresh one.
            lock(&self.client).take();
        }

        let client = self.ensure_client();
        self.stopping.store(false, Ordering::SeqCst);
        log::info!(target: self.sink.target(), "Starting miner");

        let handle: JoinHandle<i32> = tokio::spawn(run_client(
            client,
            self.state_store.clone(),
            self.sink,
        ));
        let abort = handle.abort_handle();
        let sink = self.sink;
        let run = async move {
            match handle.await {
                Ok(status) => status,
                Err(e) => {
                    log::error!(target: sink.target(), "{}", MinerError::from(e));
                    1
                }
            }
        }
        .boxed()
        .shared();

        *task = Some(WorkerTask {
            run: run.clone(),
            handle: abort,
        });
        (true, run)
    }

    /// Closes the client and waits for the worker task to finish
    ///
    /// The task runs independently of this future: dropping the returned
    /// future does not abandon the worker mid-shutdown.
    pub async fn stop(&self) {
        if !self.signal_close() {
            return;
        }
        let run = lock(&self.task).as_ref().map(|t| t.run.clone());
        if let Some(run) = run {
            run.await;
        }
    }

    /// Asks the client to close without waiting
    ///
    /// Safe to call from synchronous contexts such as signal handlers.
    pub fn request_stop(&self) {
        self.signal_close();
    }

    fn signal_close(&self) -> bool {
        let Some(client) = self.client() else {
            return false;
        };
        self.stopping.store(true, Ordering::SeqCst);
        client.gui().close();
        client.close();
        true
    }

    /// Current lifecycle phase
    pub fn lifecycle(&self) -> Lifecycle {
        let task = lock(&self.task);
        match task.as_ref() {
            Some(t) if !t.is_finished() => {
                if self.stopping.load(Ordering::SeqCst) {
                    Lifecycle::Stopping
                } else {
                    Lifecycle::Running
                }
            }
            _ => Lifecycle::Idle,
        }
    }

    /// True while a worker task exists and has not finished
    pub fn is_running(&self) -> bool {
        lock(&self.task).as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Moves the client to the inventory refresh phase
    pub fn reload_state(&self) {
        self.ensure_client().change_state(State::InventoryFetch);
    }

    /// Requests an inventory refresh and records the trigger time
    ///
    /// # Returns
    /// `AlreadyInProgress` when the client already reports the refresh
    /// phase, `Queued` otherwise
    pub fn reload(&self) -> ReloadOutcome {
        if self.state_store.state() == State::InventoryFetch {
            return ReloadOutcome::AlreadyInProgress;
        }
        self.force_reload();
        ReloadOutcome::Queued
    }

    /// Re-enters the refresh phase even if the client reports it already
    ///
    /// Used to unstick a client that stalled mid-refresh.
    pub fn force_reload(&self) {
        self.reload_state();
        self.state_store.set_last_reload(None);
    }

    /// Requests a switch to a specific channel
    ///
    /// `None` lets the client's own selection logic decide.
    pub fn switch_channel(&self, channel: Option<ChannelRef>) {
        self.state_store.set_pending_switch(channel);
        self.ensure_client().change_state(State::ChannelSwitch);
    }

    /// Takes the pending switch request and resolves it to a live channel
    ///
    /// Returns `None` when nothing was requested or nothing matched; the
    /// client should then pick a channel on its own.
    pub fn consume_switch_request(&self) -> Option<Channel> {
        let client = self.client()?;
        let request = self.state_store.take_pending_switch()?;
        resolve_channel(&client.channels(), &request)
    }

    /// Client refresh interval (creates the client if needed)
    pub fn expected_refresh_interval(&self) -> Duration {
        self.ensure_client().expected_refresh_interval()
    }

    /// Snapshot with a freshly projected settings section
    pub fn get_snapshot(&self) -> Snapshot {
        self.state_store.update_settings(&read_settings(&self.settings));
        self.state_store.get_snapshot()
    }
}

impl Supervised for MinerService {
    fn is_running(&self) -> bool {
        MinerService::is_running(self)
    }

    fn expected_refresh_interval(&self) -> Duration {
        MinerService::expected_refresh_interval(self)
    }

    fn trigger_reload(&self) -> Result<(), MinerError> {
        self.force_reload();
        Ok(())
    }
}

/// Finds the channel a switch request names
///
/// IDs are looked up directly; strings match the login or display name
/// exactly (case-sensitive).
pub fn resolve_channel(channels: &BTreeMap<u64, Channel>, request: &ChannelRef) -> Option<Channel> {
    match request {
        ChannelRef::Id(id) => channels.get(id).cloned(),
        ChannelRef::Login(name) => channels
            .values()
            .find(|c| &c.login == name || &c.display_name == name)
            .cloned(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read access to shared settings, surviving a poisoned lock
pub fn read_settings(settings: &SharedSettings) -> RwLockReadGuard<'_, Settings> {
    settings.read().unwrap_or_else(PoisonError::into_inner)
}

/// Runs the client once and performs the shutdown sequence
async fn run_client(client: Arc<dyn MinerClient>, store: Arc<StateStore>, sink: LogSink) -> i32 {
    let gui = client.gui();
    let signals = SignalGuard::install(client.clone(), sink);
    let outcome = AssertUnwindSafe(client.run()).catch_unwind().await;

    let status = match outcome {
        Ok(Ok(status)) => status,
        Ok(Err(e)) if e.is_auth_challenge() => {
            log::warn!(target: sink.target(), "Authentication challenge required");
            store.record_error("Captcha required");
            gui.prevent_close();
            gui.print(
                "Your account requires a captcha to log in. \
                 Log in through a browser, then restart the miner.",
            );
            1
        }
        Ok(Err(e)) => {
            log::error!(target: sink.target(), "Fatal error encountered: {:?}", e);
            store.record_error("Fatal error encountered");
            gui.prevent_close();
            gui.print("Fatal error encountered:\n");
            gui.print(&format!("{}\n{:?}", e, e));
            1
        }
        Err(panic) => {
            let detail = panic_message(panic.as_ref());
            log::error!(target: sink.target(), "Fatal error encountered: client panicked: {}", detail);
            store.record_error("Fatal error encountered");
            gui.prevent_close();
            gui.print("Fatal error encountered:\n");
            gui.print(&format!("client panicked: {}", detail));
            1
        }
    };

    gui.print("Exiting...");
    client.shutdown().await;
    store.set_state(State::Exit);
    if !gui.close_requested() {
        gui.change_icon("error");
        gui.print("Application Terminated");
        gui.update_status("Terminated");
        gui.grab_attention(true);
    }
    // Interrupts must keep reaching the presenter while it waits.
    gui.wait_until_closed().await;
    drop(signals);
    client.save(true);
    gui.stop();
    gui.close_window();
    log::info!(target: sink.target(), "Miner exited with status {}", status);
    status
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Interrupt handlers that close the client gracefully
///
/// Listening stops when the guard is dropped. tokio leaves its process-wide
/// handler installed after that, so later interrupts are ignored rather than
/// terminating the process.
struct SignalGuard {
    task: Option<JoinHandle<()>>,
}

impl SignalGuard {
    #[cfg(unix)]
    fn install(client: Arc<dyn MinerClient>, sink: LogSink) -> Self {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut interrupt, mut terminate) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(i), Ok(t)) => (i, t),
                (Err(e), _) | (_, Err(e)) => {
                    log::warn!(target: sink.target(), "Signal handlers not installed: {}", e);
                    return Self { task: None };
                }
            };
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(_) = interrupt.recv() => {}
                    Some(_) = terminate.recv() => {}
                    else => break,
                }
                log::info!(target: sink.target(), "Interrupt received, closing");
                client.gui().close();
                client.close();
            }
        });
        Self { task: Some(task) }
    }

    #[cfg(not(unix))]
    fn install(client: Arc<dyn MinerClient>, sink: LogSink) -> Self {
        let task = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                log::info!(target: sink.target(), "Interrupt received, closing");
                client.gui().close();
                client.close();
            }
        });
        Self { task: Some(task) }
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> BTreeMap<u64, Channel> {
        let mut map = BTreeMap::new();
        map.insert(12345, Channel::new(12345, "foo", "FooTV"));
        map.insert(7, Channel::new(7, "bar", "Bar"));
        map
    }

    #[test]
    fn resolves_by_id() {
        let found = resolve_channel(&channels(), &ChannelRef::Id(12345)).unwrap();
        assert_eq!(found.login, "foo");
        assert!(resolve_channel(&channels(), &ChannelRef::Id(1)).is_none());
    }

    #[test]
    fn resolves_by_login_or_display_name() {
        let by_login = resolve_channel(&channels(), &ChannelRef::Login("foo".into()));
        assert_eq!(by_login.map(|c| c.id), Some(12345));
        let by_name = resolve_channel(&channels(), &ChannelRef::Login("FooTV".into()));
        assert_eq!(by_name.map(|c| c.id), Some(12345));
        assert!(resolve_channel(&channels(), &ChannelRef::Login("FOO".into())).is_none());
    }

    #[test]
    fn numeric_login_is_not_an_id() {
        assert!(resolve_channel(&channels(), &ChannelRef::Login("7".into())).is_none());
    }

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42u8), "unknown panic payload");
    }
}
