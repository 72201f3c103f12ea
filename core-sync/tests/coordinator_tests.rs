//! Coordinator behavior: unique runs per remote, constraints, job snapshots
//! and events.

mod common;

use async_trait::async_trait;
use bridge_traits::{
    background::{PowerMonitor, TaskConstraints},
    error::{BridgeError, Result as BridgeResult},
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
    storage::{RemoteConfigId, RemoteConfigStore},
};
use common::{remote, MemoryConfigs, MockMediaSource, MockObjectStore, StaticStoreFactory};
use core_async::sync::Semaphore;
use core_async::time::{sleep, Duration};
use core_runtime::events::{CoreEvent, DiffEvent, EventBus, SyncEvent};
use core_sync::{SyncConfig, SyncCoordinator, SyncError, SyncStatus};
use mockall::mock;
use std::sync::atomic::Ordering;
use std::sync::Arc;

mock! {
    Network {}

    #[async_trait]
    impl NetworkMonitor for Network {
        async fn get_network_info(&self) -> BridgeResult<NetworkInfo>;
        async fn is_connected(&self) -> bool;
        async fn is_metered(&self) -> bool;
    }
}

mock! {
    Power {}

    #[async_trait]
    impl PowerMonitor for Power {
        async fn is_battery_low(&self) -> BridgeResult<bool>;
    }
}

struct Harness {
    coordinator: SyncCoordinator,
    remote_id: RemoteConfigId,
    store: Arc<MockObjectStore>,
    factory: Arc<StaticStoreFactory>,
    event_bus: Arc<EventBus>,
}

async fn harness_with(store: MockObjectStore, local: &[(&str, usize)], config: SyncConfig) -> Harness {
    let media = MockMediaSource::new();
    for (name, size) in local {
        media.add(name, *size).await;
    }

    let remote = remote();
    let remote_id = remote.id;
    let configs = Arc::new(MemoryConfigs::with_remote(remote).await);
    let store = Arc::new(store);
    let factory = Arc::new(StaticStoreFactory::new(Arc::clone(&store)));
    let event_bus = Arc::new(EventBus::new(64));

    let coordinator = SyncCoordinator::new(
        config,
        Arc::clone(&event_bus),
        Arc::new(media),
        configs,
        factory.clone(),
    );

    Harness {
        coordinator,
        remote_id,
        store,
        factory,
        event_bus,
    }
}

async fn harness(store: MockObjectStore, local: &[(&str, usize)]) -> Harness {
    harness_with(store, local, SyncConfig::default()).await
}

fn network(status: NetworkStatus, metered: bool) -> MockNetwork {
    let mut monitor = MockNetwork::new();
    monitor.expect_get_network_info().returning(move || {
        Ok(NetworkInfo {
            status,
            network_type: Some(NetworkType::WiFi),
            is_metered: metered,
            is_expensive: metered,
        })
    });
    monitor
}

fn power(low: bool) -> MockPower {
    let mut monitor = MockPower::new();
    monitor.expect_is_battery_low().returning(move || Ok(low));
    monitor
}

async fn wait_for_attempts(store: &MockObjectStore, expected: usize) {
    for _ in 0..200 {
        if store.attempts.load(Ordering::SeqCst) >= expected {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("upload attempt {} never happened", expected);
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn sync_uploads_missing_items_and_publishes_events() {
    let h = harness(
        MockObjectStore::with_objects(&["a.png"]),
        &[("a.png", 100), ("b.png", 50), ("c.png", 25)],
    )
    .await;
    let mut events = h.event_bus.subscribe();

    let job_id = h.coordinator.start_sync(h.remote_id).await.unwrap();
    let job = h.coordinator.wait_for_completion(job_id).await.unwrap();

    assert_eq!(job.status, SyncStatus::Completed);
    assert_eq!(job.remote_id, h.remote_id);
    assert_eq!(job.diff_count(), 2);
    assert_eq!(job.diff_bytes(), 75);
    assert_eq!(job.progress_count(), 2);
    assert_eq!(job.progress_bytes(), 75);
    assert_eq!(job.progress_percentage(), 100);
    assert!(job.error().is_none());
    assert_eq!(h.store.object_names().await, vec!["a.png", "b.png", "c.png"]);

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert!(matches!(received[0], CoreEvent::Sync(SyncEvent::Started { .. })));
    assert!(matches!(
        received[1],
        CoreEvent::Diff(DiffEvent::Computed { missing_count: 2, missing_bytes: 75, .. })
    ));
    assert!(matches!(
        received[2],
        CoreEvent::Sync(SyncEvent::Progress { items_transferred: 1, bytes_transferred: 50, percent: 66, .. })
    ));
    assert!(matches!(
        received[3],
        CoreEvent::Sync(SyncEvent::Progress { items_transferred: 2, percent: 100, .. })
    ));
    assert!(matches!(
        received[4],
        CoreEvent::Sync(SyncEvent::Completed { items_transferred: 2, bytes_transferred: 75, .. })
    ));
    assert_eq!(received.len(), 5);
}

#[tokio::test]
async fn nothing_to_upload_completes_immediately() {
    let h = harness(MockObjectStore::with_objects(&["a.png"]), &[("a.png", 100)]).await;

    let job_id = h.coordinator.start_sync(h.remote_id).await.unwrap();
    let job = h.coordinator.wait_for_completion(job_id).await.unwrap();

    assert_eq!(job.status, SyncStatus::Completed);
    assert_eq!(job.diff_count(), 0);
    assert_eq!(job.progress_percentage(), 0);
    assert_eq!(h.store.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upload_failure_fails_job_with_message() {
    let h = harness(MockObjectStore::new(), &[("a.png", 10), ("b.png", 20)]).await;
    h.store.reject("b.png").await;

    let job_id = h.coordinator.start_sync(h.remote_id).await.unwrap();
    let job = h.coordinator.wait_for_completion(job_id).await.unwrap();

    assert_eq!(job.status, SyncStatus::Failed);
    assert_eq!(job.progress_count(), 1);
    let error = job.error().unwrap();
    assert!(error.starts_with("Failed to sync files: Failed to upload 'b.png'"), "{}", error);
    assert!(!h.coordinator.is_sync_active(h.remote_id).await);
}

#[tokio::test]
async fn diff_failure_fails_job() {
    let h = harness(MockObjectStore::failing_listing(), &[("a.png", 10)]).await;

    let job_id = h.coordinator.start_sync(h.remote_id).await.unwrap();
    let job = h.coordinator.wait_for_completion(job_id).await.unwrap();

    assert_eq!(job.status, SyncStatus::Failed);
    assert!(job.diff.is_none());
    assert!(job
        .error()
        .unwrap()
        .starts_with("Failed to create diff: Failed to list remote objects"));
}

#[tokio::test]
async fn second_start_is_rejected_while_active() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(MockObjectStore::gated(Arc::clone(&gate)), &[("a.png", 10)]).await;

    let first = h.coordinator.start_sync(h.remote_id).await.unwrap();
    wait_for_attempts(&h.store, 1).await;

    assert!(h.coordinator.is_sync_active(h.remote_id).await);
    let err = h.coordinator.start_sync(h.remote_id).await.unwrap_err();
    assert!(matches!(err, SyncError::SyncInProgress { .. }));

    gate.add_permits(1);
    let job = h.coordinator.wait_for_completion(first).await.unwrap();
    assert_eq!(job.status, SyncStatus::Completed);

    // The remote is free again once the run finished.
    let second = h.coordinator.start_sync(h.remote_id).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(h.coordinator.list_jobs(h.remote_id).await.len(), 2);
}

#[tokio::test]
async fn cancel_stops_before_next_item() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        MockObjectStore::gated(Arc::clone(&gate)),
        &[("a.png", 10), ("b.png", 20), ("c.png", 30)],
    )
    .await;

    let job_id = h.coordinator.start_sync(h.remote_id).await.unwrap();
    let mut updates = h.coordinator.subscribe(job_id).await.unwrap();
    wait_for_attempts(&h.store, 1).await;

    h.coordinator.cancel_sync(job_id).await.unwrap();
    gate.add_permits(10);

    let job = updates
        .wait_for(|job| job.status.is_terminal())
        .await
        .unwrap()
        .clone();
    assert_eq!(job.status, SyncStatus::Cancelled);
    assert_eq!(job.progress_count(), 1);
    assert_eq!(h.store.object_names().await, vec!["a.png"]);

    let err = h.coordinator.cancel_sync(job_id).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidStateTransition { .. }));
}

#[tokio::test]
async fn crashed_run_fails_job_and_frees_remote() {
    let h = harness(MockObjectStore::new(), &[("a.png", 10), ("b.png", 20)]).await;
    h.store.crash_on("b.png").await;

    let job_id = h.coordinator.start_sync(h.remote_id).await.unwrap();
    let job = tokio::time::timeout(
        Duration::from_secs(5),
        h.coordinator.wait_for_completion(job_id),
    )
    .await
    .expect("crashed run must still finish")
    .unwrap();

    assert_eq!(job.status, SyncStatus::Failed);
    assert!(job.error().unwrap().starts_with("Sync task aborted"), "{:?}", job.error());
    assert!(!h.coordinator.is_sync_active(h.remote_id).await);
    assert_eq!(h.store.object_names().await, vec!["a.png"]);

    let err = h.coordinator.cancel_sync(job_id).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidStateTransition { .. }));

    // The remote accepts the next run.
    let retry = h.coordinator.start_sync(h.remote_id).await.unwrap();
    assert_ne!(retry, job_id);
}

#[tokio::test]
async fn finished_jobs_are_pruned_beyond_history_limit() {
    let config = SyncConfig {
        job_history_limit: 2,
        ..SyncConfig::default()
    };
    let h = harness_with(MockObjectStore::new(), &[], config).await;

    let mut job_ids = Vec::new();
    for _ in 0..4 {
        let job_id = h.coordinator.start_sync(h.remote_id).await.unwrap();
        h.coordinator.wait_for_completion(job_id).await.unwrap();
        job_ids.push(job_id);
    }

    // The fourth start kept the two newest finished jobs next to itself.
    let history: Vec<_> = h
        .coordinator
        .list_jobs(h.remote_id)
        .await
        .into_iter()
        .map(|job| job.id)
        .collect();
    assert_eq!(history, vec![job_ids[3], job_ids[2], job_ids[1]]);
    assert!(matches!(
        h.coordinator.get_status(job_ids[0]).await,
        Err(SyncError::JobNotFound { .. })
    ));
}

#[tokio::test]
async fn run_times_out() {
    let gate = Arc::new(Semaphore::new(0));
    let config = SyncConfig {
        sync_timeout: Duration::from_millis(50),
        ..SyncConfig::default()
    };
    let h = harness_with(MockObjectStore::gated(gate), &[("a.png", 10)], config).await;

    let job_id = h.coordinator.start_sync(h.remote_id).await.unwrap();
    let job = h.coordinator.wait_for_completion(job_id).await.unwrap();

    assert_eq!(job.status, SyncStatus::Failed);
    assert!(job.error().unwrap().contains("timeout"));
}

// ============================================================================
// Preconditions
// ============================================================================

#[tokio::test]
async fn unknown_remote_is_rejected() {
    let h = harness(MockObjectStore::new(), &[]).await;

    let err = h
        .coordinator
        .start_sync(RemoteConfigId::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::RemoteNotFound { .. }));
    assert_eq!(h.factory.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn connection_failure_is_reported() {
    let configs = Arc::new(MemoryConfigs::default());
    let mut bad = remote();
    bad.bucket.clear();
    configs.save(&bad).await.unwrap();

    let store = Arc::new(MockObjectStore::new());
    let coordinator = SyncCoordinator::new(
        SyncConfig::default(),
        Arc::new(EventBus::default()),
        Arc::new(MockMediaSource::new()),
        configs,
        Arc::new(StaticStoreFactory::new(store)),
    );

    let err = coordinator.start_sync(bad.id).await.unwrap_err();
    assert!(matches!(err, SyncError::Connection(msg) if msg.contains("bucket")));
}

#[tokio::test]
async fn disconnected_network_blocks_start() {
    let h = harness(MockObjectStore::new(), &[("a.png", 10)]).await;
    let coordinator = h
        .coordinator
        .with_network_monitor(Arc::new(network(NetworkStatus::Disconnected, false)));

    let err = coordinator.start_sync(h.remote_id).await.unwrap_err();

    assert!(matches!(err, SyncError::ConstraintsNotMet(_)));
    assert!(!coordinator.is_sync_active(h.remote_id).await);
}

#[tokio::test]
async fn metered_network_blocks_only_when_unmetered_required() {
    let config = SyncConfig {
        constraints: TaskConstraints {
            requires_unmetered: true,
            ..TaskConstraints::default()
        },
        ..SyncConfig::default()
    };
    let strict = harness_with(MockObjectStore::new(), &[], config).await;
    let strict_coordinator = strict
        .coordinator
        .with_network_monitor(Arc::new(network(NetworkStatus::Connected, true)));
    let err = strict_coordinator.start_sync(strict.remote_id).await.unwrap_err();
    assert!(matches!(err, SyncError::ConstraintsNotMet(msg) if msg.contains("metered")));

    let relaxed = harness(MockObjectStore::new(), &[]).await;
    let relaxed_coordinator = relaxed
        .coordinator
        .with_network_monitor(Arc::new(network(NetworkStatus::Connected, true)));
    assert!(relaxed_coordinator.start_sync(relaxed.remote_id).await.is_ok());
}

#[tokio::test]
async fn low_battery_blocks_start() {
    let h = harness(MockObjectStore::new(), &[("a.png", 10)]).await;
    let coordinator = h
        .coordinator
        .with_network_monitor(Arc::new(network(NetworkStatus::Connected, false)))
        .with_power_monitor(Arc::new(power(true)));

    let err = coordinator.start_sync(h.remote_id).await.unwrap_err();
    assert!(matches!(err, SyncError::ConstraintsNotMet(msg) if msg == "Battery is low"));
}

#[tokio::test]
async fn monitor_errors_are_constraint_failures() {
    let h = harness(MockObjectStore::new(), &[("a.png", 10)]).await;
    let mut broken_power = MockPower::new();
    broken_power
        .expect_is_battery_low()
        .returning(|| Err(BridgeError::NotAvailable("battery service".to_string())));
    let coordinator = h
        .coordinator
        .clone()
        .with_power_monitor(Arc::new(broken_power));

    let err = coordinator.start_sync(h.remote_id).await.unwrap_err();
    assert!(
        matches!(&err, SyncError::ConstraintsNotMet(msg) if msg.starts_with("Failed to check battery")),
        "{}",
        err
    );

    let mut broken_network = MockNetwork::new();
    broken_network
        .expect_get_network_info()
        .returning(|| Err(BridgeError::NotAvailable("connectivity service".to_string())));
    let coordinator = h.coordinator.with_network_monitor(Arc::new(broken_network));

    let err = coordinator.start_sync(h.remote_id).await.unwrap_err();
    assert!(
        matches!(&err, SyncError::ConstraintsNotMet(msg) if msg.starts_with("Failed to check network")),
        "{}",
        err
    );
    assert!(!coordinator.is_sync_active(h.remote_id).await);
}

#[tokio::test]
async fn constraints_can_be_disabled() {
    let config = SyncConfig {
        constraints: TaskConstraints::none(),
        ..SyncConfig::default()
    };
    let h = harness_with(MockObjectStore::new(), &[("a.png", 10)], config).await;
    let mut offline = MockNetwork::new();
    offline.expect_get_network_info().never();
    let coordinator = h
        .coordinator
        .with_network_monitor(Arc::new(offline))
        .with_power_monitor(Arc::new(power(true)));

    let job_id = coordinator.start_sync(h.remote_id).await.unwrap();
    let job = coordinator.wait_for_completion(job_id).await.unwrap();
    assert_eq!(job.status, SyncStatus::Completed);
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn compute_diff_previews_without_uploading() {
    let h = harness(MockObjectStore::with_objects(&["a.png"]), &[("a.png", 100), ("b.png", 50)]).await;
    let mut events = h.event_bus.subscribe();

    let diff = h.coordinator.compute_diff(h.remote_id).await.unwrap();

    assert_eq!(diff.missing_count(), 1);
    assert_eq!(diff.missing_bytes(), 50);
    assert_eq!(h.store.attempts.load(Ordering::SeqCst), 0);
    assert!(matches!(
        events.try_recv().unwrap(),
        CoreEvent::Diff(DiffEvent::Computed { missing_count: 1, .. })
    ));
}

#[tokio::test]
async fn unknown_job_queries_fail() {
    let h = harness(MockObjectStore::new(), &[]).await;
    let job_id = core_sync::SyncJobId::new();

    assert!(matches!(
        h.coordinator.get_status(job_id).await,
        Err(SyncError::JobNotFound { .. })
    ));
    assert!(h.coordinator.subscribe(job_id).await.is_err());
    assert!(h.coordinator.cancel_sync(job_id).await.is_err());
    assert!(h.coordinator.list_jobs(h.remote_id).await.is_empty());
}
