#![allow(dead_code)]

use async_trait::async_trait;
use drops_miner_rs::config::{RuntimeArgs, Settings, SettingsFile, SharedSettings};
use drops_miner_rs::gui::{HeadlessGui, Presenter};
use drops_miner_rs::miner::{Channel, ClientContext, ClientFactory, MinerClient};
use drops_miner_rs::{LogSink, MinerError, MinerService, State};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// How a scripted client's `run` ends
#[derive(Clone, Copy, Debug)]
pub enum Script {
    /// Runs until closed, then returns the status
    UntilClosed(i32),
    /// Fails at once with an authentication challenge
    AuthChallenge,
    /// Fails at once with a client error
    Fault,
    /// Panics at once
    Panic,
}

pub struct ScriptedClient {
    script: Script,
    gui: Arc<HeadlessGui>,
    closed: AtomicBool,
    wake: Notify,
    running: AtomicBool,
    pub runs: AtomicUsize,
    pub saves: AtomicUsize,
    pub phases: Mutex<Vec<State>>,
    pub channels: Mutex<BTreeMap<u64, Channel>>,
}

impl ScriptedClient {
    fn new(script: Script) -> Self {
        Self {
            script,
            gui: Arc::new(HeadlessGui::new(LogSink::watch())),
            closed: AtomicBool::new(false),
            wake: Notify::new(),
            running: AtomicBool::new(false),
            runs: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            phases: Mutex::new(Vec::new()),
            channels: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn last_phase(&self) -> Option<State> {
        self.phases.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl MinerClient for ScriptedClient {
    async fn run(&self) -> Result<i32, MinerError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::AuthChallenge => return Err(MinerError::AuthChallenge),
            Script::Fault => return Err(MinerError::ClientError("socket closed".into())),
            Script::Panic => panic!("scripted panic"),
            Script::UntilClosed(_) => {}
        }
        self.running.store(true, Ordering::SeqCst);
        while !self.closed.load(Ordering::SeqCst) {
            self.wake.notified().await;
        }
        self.running.store(false, Ordering::SeqCst);
        match self.script {
            Script::UntilClosed(status) => Ok(status),
            _ => unreachable!(),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn change_state(&self, state: State) {
        self.phases.lock().unwrap().push(state);
    }

    fn expected_refresh_interval(&self) -> Duration {
        Duration::from_secs(900)
    }

    fn channels(&self) -> BTreeMap<u64, Channel> {
        self.channels.lock().unwrap().clone()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn gui(&self) -> Arc<dyn Presenter> {
        self.gui.clone()
    }

    fn save(&self, _force: bool) {
        self.saves.fetch_add(1, Ordering::SeqCst);
    }
}

/// Clients built by a scripted factory, in creation order
pub type Built = Arc<Mutex<Vec<Arc<ScriptedClient>>>>;

pub fn scripted_factory(script: Script) -> (ClientFactory, Built) {
    let built: Built = Arc::new(Mutex::new(Vec::new()));
    let record = built.clone();
    let factory: ClientFactory = Box::new(move |_ctx: ClientContext| -> Arc<dyn MinerClient> {
        let client = Arc::new(ScriptedClient::new(script));
        record.lock().unwrap().push(client.clone());
        client
    });
    (factory, built)
}

pub fn settings_in(dir: &Path) -> SharedSettings {
    Settings::new(SettingsFile::default(), RuntimeArgs::in_dir(dir)).into_shared()
}

pub fn service_in(dir: &Path, script: Script) -> (Arc<MinerService>, Built) {
    let (factory, built) = scripted_factory(script);
    let service = MinerService::new(settings_in(dir), factory, LogSink::main());
    (service, built)
}

pub fn only_client(built: &Built) -> Arc<ScriptedClient> {
    let clients = built.lock().unwrap();
    assert_eq!(clients.len(), 1, "expected exactly one client");
    clients[0].clone()
}

/// Yields until `cond` holds
pub async fn wait_for(cond: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
