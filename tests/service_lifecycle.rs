mod common;

use chrono::{TimeDelta, Utc};
use common::{Script, only_client, service_in, settings_in, wait_for};
use drops_miner_rs::miner::watchdog::Action;
use drops_miner_rs::miner::{Channel, Lifecycle};
use drops_miner_rs::state::JournalKind;
use drops_miner_rs::{
    ChannelRef, LogSink, MinerClient, MinerService, ReloadOutcome, StandbyClient, State, Watchdog,
};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn concurrent_starts_share_one_execution() {
    let dir = tempfile::tempdir().unwrap();
    let (service, built) = service_in(dir.path(), Script::UntilClosed(0));

    let closer = async {
        wait_for(|| service.is_running()).await;
        wait_for(|| built.lock().unwrap().first().is_some_and(|c| c.runs.load(Ordering::SeqCst) == 1)).await;
        service.request_stop();
    };
    let (first, second, ()) = tokio::join!(service.start(), service.start(), closer);

    assert_eq!(first, 0);
    assert_eq!(second, 0);
    let client = only_client(&built);
    assert_eq!(client.runs.load(Ordering::SeqCst), 1);
    assert!(!service.is_running());
    assert_eq!(service.lifecycle(), Lifecycle::Idle);
}

#[tokio::test]
async fn client_status_becomes_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service_in(dir.path(), Script::UntilClosed(3));

    assert!(service.ensure_started());
    assert!(!service.ensure_started());
    assert_eq!(service.lifecycle(), Lifecycle::Running);

    let (status, ()) = tokio::join!(service.start(), service.stop());
    assert_eq!(status, 3);
    assert!(!service.is_running());
}

#[tokio::test]
async fn stop_runs_shutdown_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let (service, built) = service_in(dir.path(), Script::UntilClosed(0));

    service.ensure_started();
    wait_for(|| only_client(&built).is_running()).await;
    service.stop().await;

    let client = only_client(&built);
    assert_eq!(client.saves.load(Ordering::SeqCst), 1);
    assert_eq!(service.state_store().state(), State::Exit);
    assert!(service.get_snapshot().runtime.errors.is_empty());
}

#[tokio::test]
async fn stop_before_start_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let (service, built) = service_in(dir.path(), Script::UntilClosed(0));
    service.stop().await;
    service.request_stop();
    assert!(built.lock().unwrap().is_empty());
    assert_eq!(service.lifecycle(), Lifecycle::Idle);
}

#[tokio::test]
async fn restart_after_stop_runs_a_fresh_client() {
    let dir = tempfile::tempdir().unwrap();
    let (service, built) = service_in(dir.path(), Script::UntilClosed(0));

    service.ensure_started();
    wait_for(|| only_client(&built).is_running()).await;
    service.stop().await;

    assert!(service.ensure_started());
    wait_for(|| built.lock().unwrap().len() == 2).await;
    let second = built.lock().unwrap()[1].clone();
    wait_for(|| second.is_running()).await;
    assert!(service.is_running());
    assert_eq!(service.lifecycle(), Lifecycle::Running);

    service.stop().await;
    let clients = built.lock().unwrap().clone();
    assert!(clients.iter().all(|c| c.runs.load(Ordering::SeqCst) == 1));
    assert!(!second.is_running());
}

#[tokio::test]
async fn standby_client_serves_again_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let service = MinerService::new(settings_in(dir.path()), StandbyClient::factory(), LogSink::main());
    let client_running = || service.client().is_some_and(|c| c.is_running());

    service.ensure_started();
    wait_for(client_running).await;
    service.stop().await;
    assert_eq!(service.state_store().state(), State::Exit);

    assert!(service.ensure_started());
    wait_for(client_running).await;
    wait_for(|| service.state_store().state() == State::Idle).await;
    assert!(service.is_running());

    service.stop().await;
    assert!(!service.is_running());
}

#[tokio::test]
async fn auth_challenge_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let (service, built) = service_in(dir.path(), Script::AuthChallenge);

    assert_eq!(service.start().await, 1);
    let snapshot = service.get_snapshot();
    assert_eq!(snapshot.runtime.errors.back().map(String::as_str), Some("Captcha required"));
    assert_eq!(snapshot.runtime.state, State::Exit);
    assert_eq!(snapshot.runtime.journal[0].kind, JournalKind::Error);
    assert_eq!(only_client(&built).saves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unexpected_fault_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service_in(dir.path(), Script::Fault);

    assert_eq!(service.start().await, 1);
    let errors = service.get_snapshot().runtime.errors;
    assert_eq!(errors.back().map(String::as_str), Some("Fatal error encountered"));
    assert!(!service.is_running());
}

#[tokio::test]
async fn panicking_client_is_contained() {
    let dir = tempfile::tempdir().unwrap();
    let (service, built) = service_in(dir.path(), Script::Panic);

    assert_eq!(service.start().await, 1);
    assert_eq!(only_client(&built).saves.load(Ordering::SeqCst), 1);
    assert!(service.ensure_started());
    assert_eq!(service.start().await, 1);
}

#[tokio::test]
async fn reload_queues_once_per_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let (service, built) = service_in(dir.path(), Script::UntilClosed(0));
    let store = service.state_store();
    store.set_state(State::Idle);

    assert_eq!(service.reload(), ReloadOutcome::Queued);
    let client = only_client(&built);
    assert_eq!(client.last_phase(), Some(State::InventoryFetch));
    assert!(service.get_snapshot().runtime.last_reload.is_some());

    store.set_state(State::InventoryFetch);
    assert_eq!(service.reload(), ReloadOutcome::AlreadyInProgress);
    assert_eq!(client.phases.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn watchdog_unsticks_a_stalled_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let (service, built) = service_in(dir.path(), Script::UntilClosed(0));
    service.ensure_started();
    wait_for(|| only_client(&built).is_running()).await;

    let store = service.state_store();
    let stale = Utc::now() - TimeDelta::hours(3);
    store.set_state(State::InventoryFetch);
    store.set_last_reload(Some(stale));
    let before = store.get_snapshot().runtime.last_reload;

    let mut watchdog = Watchdog::new(store.clone(), service.clone(), LogSink::watchdog());
    assert_eq!(watchdog.tick(Utc::now()).unwrap().action, Action::Hysteresis);
    assert!(only_client(&built).phases.lock().unwrap().is_empty());
    assert_eq!(watchdog.tick(Utc::now()).unwrap().action, Action::Reload);

    assert_eq!(only_client(&built).last_phase(), Some(State::InventoryFetch));
    assert_ne!(store.get_snapshot().runtime.last_reload, before);
    assert_eq!(watchdog.tick(Utc::now()).unwrap().action, Action::WithinThreshold);

    service.stop().await;
}

#[tokio::test]
async fn switch_request_is_consumed_once() {
    let dir = tempfile::tempdir().unwrap();
    let (service, built) = service_in(dir.path(), Script::UntilClosed(0));

    service.switch_channel(Some(ChannelRef::Login("FooTV".into())));
    let client = only_client(&built);
    assert_eq!(client.last_phase(), Some(State::ChannelSwitch));
    client
        .channels
        .lock()
        .unwrap()
        .insert(12345, Channel::new(12345, "foo", "FooTV"));

    assert_eq!(service.consume_switch_request().map(|c| c.id), Some(12345));
    assert!(service.consume_switch_request().is_none());

    service.switch_channel(Some(ChannelRef::Id(999)));
    assert!(service.consume_switch_request().is_none());
    assert!(service.get_snapshot().runtime.pending_switch.is_none());
}

#[tokio::test]
async fn consume_without_client_keeps_request() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service_in(dir.path(), Script::UntilClosed(0));
    service
        .state_store()
        .set_pending_switch(Some(ChannelRef::Id(12345)));
    assert!(service.consume_switch_request().is_none());
    assert_eq!(
        service.get_snapshot().runtime.pending_switch,
        Some(ChannelRef::Id(12345))
    );
}

#[tokio::test]
async fn journal_survives_restart_of_the_process() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (service, _) = service_in(dir.path(), Script::AuthChallenge);
        assert_eq!(service.start().await, 1);
    }
    let (service, _) = service_in(dir.path(), Script::UntilClosed(0));
    let journal = service.get_snapshot().runtime.journal;
    assert!(journal.iter().any(|e| e.message == "Captcha required"));
}
