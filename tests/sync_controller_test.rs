mod common;

use catalog_sync::{
    BulkLoader, ConnectivityHub, FilterCriteria, SyncController, SyncError, SyncHandle,
    SyncOptions, SyncState,
};
use common::ScriptedApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn start(api: Arc<ScriptedApi>, hub: &ConnectivityHub, options: SyncOptions) -> SyncController {
    let loader = BulkLoader::new(api, 999, 4);
    SyncController::start(loader, hub.clone(), options)
}

fn every(secs: u64) -> SyncOptions {
    SyncOptions {
        retry_interval: Duration::from_secs(secs),
        max_attempts: None,
    }
}

async fn wait_for_state(handle: &SyncHandle, check: impl FnMut(&SyncState) -> bool) -> SyncState {
    let mut rx = handle.subscribe_state();
    let state = rx.wait_for(check).await.unwrap().clone();
    state
}

#[tokio::test(start_paused = true)]
async fn test_first_load_reaches_ready() {
    let api = Arc::new(ScriptedApi::numbered(12));
    let hub = ConnectivityHub::new();
    let controller = start(api.clone(), &hub, every(5));
    let handle = controller.handle();

    wait_for_state(&handle, SyncState::is_ready).await;

    let catalog = handle.catalog();
    assert_eq!(catalog.len(), 12);
    let categories: Vec<String> = handle.category_catalog().into_iter().collect();
    assert_eq!(categories, vec!["fire", "grass", "water"]);
    assert_eq!(api.index_calls(), 1);
    assert_eq!(hub.listener_count(), 0);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_load_degrades_then_timer_retry_recovers() {
    let api = Arc::new(ScriptedApi::numbered(10).fail_index_times(1));
    let hub = ConnectivityHub::new();
    let started = Instant::now();
    let controller = start(api.clone(), &hub, every(5));
    let handle = controller.handle();

    let degraded = wait_for_state(&handle, SyncState::is_degraded).await;
    match degraded {
        SyncState::Degraded { attempt, last_error } => {
            assert_eq!(attempt, 1);
            assert!(last_error.contains("index fetch failed"));
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert!(handle.catalog().is_empty());
    assert_eq!(hub.listener_count(), 1);

    wait_for_state(&handle, SyncState::is_ready).await;
    assert!(started.elapsed() >= Duration::from_secs(5));
    // the whole catalog is published before Ready is observable
    assert_eq!(handle.catalog().len(), 10);
    assert_eq!(hub.listener_count(), 0);
    assert_eq!(api.index_calls(), 2);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_repeated_failures_count_attempts() {
    let api = Arc::new(ScriptedApi::numbered(3).fail_index_times(3));
    let hub = ConnectivityHub::new();
    let controller = start(api.clone(), &hub, every(5));
    let handle = controller.handle();

    let state = wait_for_state(&handle, |s| {
        matches!(s, SyncState::Degraded { attempt: 3, .. })
    })
    .await;
    assert!(state.is_degraded());

    wait_for_state(&handle, SyncState::is_ready).await;
    assert_eq!(api.index_calls(), 4);
    assert_eq!(handle.catalog().len(), 3);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_signal_retries_without_waiting_for_timer() {
    let api = Arc::new(ScriptedApi::numbered(5).fail_index_times(1));
    let hub = ConnectivityHub::new();
    let started = Instant::now();
    let controller = start(api.clone(), &hub, every(3600));
    let handle = controller.handle();

    wait_for_state(&handle, SyncState::is_degraded).await;
    hub.notify_restored();

    wait_for_state(&handle, SyncState::is_ready).await;
    assert!(started.elapsed() < Duration::from_secs(3600));
    assert_eq!(api.index_calls(), 2);
    assert_eq!(hub.listener_count(), 0);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_signal_during_first_load_is_kept_for_retry() {
    let api = Arc::new(
        ScriptedApi::numbered(5)
            .fail_index_times(1)
            .with_index_delay(Duration::from_secs(1)),
    );
    let hub = ConnectivityHub::new();
    let started = Instant::now();
    let controller = start(api.clone(), &hub, every(3600));
    let handle = controller.handle();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(handle.sync_state(), SyncState::Loading);
    assert_eq!(hub.listener_count(), 1);
    hub.notify_restored();

    wait_for_state(&handle, SyncState::is_ready).await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(api.index_calls(), 2);
    assert_eq!(hub.listener_count(), 0);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_signals_during_attempt_causes_one_retry() {
    let api = Arc::new(
        ScriptedApi::numbered(3)
            .fail_index_times(10)
            .with_index_delay(Duration::from_secs(1)),
    );
    let hub = ConnectivityHub::new();
    let controller = start(api.clone(), &hub, every(3600));
    let handle = controller.handle();

    wait_for_state(&handle, SyncState::is_degraded).await;
    hub.notify_restored();
    tokio::time::sleep(Duration::from_millis(100)).await;
    // second attempt is in flight
    assert_eq!(api.index_calls(), 2);
    for _ in 0..3 {
        hub.notify_restored();
    }

    wait_for_state(&handle, |s| {
        matches!(s, SyncState::Degraded { attempt: 3, .. })
    })
    .await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.index_calls(), 3);
    assert!(matches!(
        handle.sync_state(),
        SyncState::Degraded { attempt: 3, .. }
    ));

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_reload_while_degraded_restarts_attempts() {
    let api = Arc::new(
        ScriptedApi::numbered(4)
            .fail_index_times(3)
            .with_index_delay(Duration::from_secs(1)),
    );
    let hub = ConnectivityHub::new();
    let controller = start(api.clone(), &hub, every(5));
    let handle = controller.handle();

    wait_for_state(&handle, |s| {
        matches!(s, SyncState::Degraded { attempt: 2, .. })
    })
    .await;
    assert_eq!(hub.listener_count(), 1);

    handle.request_reload().unwrap();
    wait_for_state(&handle, |s| *s == SyncState::Loading).await;
    // the old session's subscription is gone, the new one is live
    assert_eq!(hub.listener_count(), 1);

    wait_for_state(&handle, |s| {
        matches!(s, SyncState::Degraded { attempt: 1, .. })
    })
    .await;
    assert_eq!(hub.listener_count(), 1);

    wait_for_state(&handle, SyncState::is_ready).await;
    assert_eq!(handle.catalog().len(), 4);
    assert_eq!(api.index_calls(), 4);
    assert_eq!(hub.listener_count(), 0);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_attempt_cap_stops_automatic_retries() {
    let api = Arc::new(ScriptedApi::numbered(4).fail_index_times(2));
    let hub = ConnectivityHub::new();
    let options = SyncOptions {
        retry_interval: Duration::from_secs(5),
        max_attempts: Some(2),
    };
    let controller = start(api.clone(), &hub, options);
    let handle = controller.handle();

    wait_for_state(&handle, |s| {
        matches!(s, SyncState::Degraded { attempt: 2, .. })
    })
    .await;
    assert_eq!(hub.listener_count(), 0);

    tokio::time::sleep(Duration::from_secs(60)).await;
    hub.notify_restored();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(api.index_calls(), 2);
    assert!(handle.sync_state().is_degraded());

    handle.request_reload().unwrap();
    wait_for_state(&handle, SyncState::is_ready).await;
    assert_eq!(handle.catalog().len(), 4);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_partial_detail_failure_still_reaches_ready() {
    let api = Arc::new(ScriptedApi::numbered(10).fail_details(&[2, 9]));
    let hub = ConnectivityHub::new();
    let controller = start(api, &hub, every(5));
    let handle = controller.handle();

    wait_for_state(&handle, SyncState::is_ready).await;
    let ids: Vec<u32> = handle.catalog().records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3, 4, 5, 6, 7, 8, 10]);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_reload_replaces_catalog() {
    let api = Arc::new(ScriptedApi::new(&[
        (1, "bulbasaur", &["grass", "poison"]),
        (4, "charmander", &["fire"]),
    ]));
    let hub = ConnectivityHub::new();
    let controller = start(api.clone(), &hub, every(5));
    let handle = controller.handle();

    wait_for_state(&handle, SyncState::is_ready).await;
    let before = handle.catalog();
    assert_eq!(before.len(), 2);

    api.set_records(&[
        (7, "squirtle", &["water"]),
        (25, "pikachu", &["electric"]),
        (133, "eevee", &["normal"]),
    ]);
    handle.request_reload().unwrap();

    let mut catalogs = handle.subscribe_catalog();
    catalogs.wait_for(|c| c.len() == 3).await.unwrap();
    wait_for_state(&handle, SyncState::is_ready).await;

    // earlier snapshots stay intact for readers that still hold them
    assert_eq!(before.len(), 2);
    let categories: Vec<String> = handle.category_catalog().into_iter().collect();
    assert_eq!(categories, vec!["electric", "normal", "water"]);
    assert_eq!(api.index_calls(), 2);

    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_filtered_reads_use_latest_criteria_without_network() {
    let api = Arc::new(ScriptedApi::new(&[
        (1, "bulbasaur", &["grass", "poison"]),
        (4, "charmander", &["fire"]),
        (7, "squirtle", &["water"]),
        (25, "pikachu", &["electric"]),
        (125, "electabuzz", &["electric"]),
    ]));
    let hub = ConnectivityHub::new();
    let controller = start(api.clone(), &hub, every(5));
    let handle = controller.handle();
    wait_for_state(&handle, SyncState::is_ready).await;

    handle.set_criteria(FilterCriteria::default().with_search("#25"));
    let first = handle.filtered();
    let second = handle.filtered();
    assert_eq!(first, second);
    assert_eq!(first.iter().map(|r| r.id).collect::<Vec<_>>(), vec![25, 125]);

    handle.update_criteria(|c| {
        c.search_text.clear();
        c.toggle_category("fire");
        c.toggle_category("water");
    });
    let ids: Vec<u32> = handle.filtered().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![4, 7]);

    handle.update_criteria(|c| c.exclude_mode = true);
    let ids: Vec<u32> = handle.filtered().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 25, 125]);

    assert_eq!(api.index_calls(), 1);
    controller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_retry_triggers() {
    let api = Arc::new(ScriptedApi::numbered(3).fail_index_times(100));
    let hub = ConnectivityHub::new();
    let controller = start(api, &hub, every(5));
    let handle = controller.handle();

    wait_for_state(&handle, SyncState::is_degraded).await;
    assert_eq!(hub.listener_count(), 1);

    controller.shutdown().await;
    assert_eq!(hub.listener_count(), 0);
    assert!(matches!(
        handle.request_reload(),
        Err(SyncError::ControllerClosed)
    ));
}
