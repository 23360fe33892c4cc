//! Offline Sync Integration Tests
//!
//! Run the resolver, the file cache, and the coordinators against an
//! in-process fake of the hosted backend. No external services needed.
//!
//! Run with: cargo test -p integration-tests --test offline_sync_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{stale_document, temp_cache_path, DocumentRow, TestBackend};
use tour_cache::FileDocumentCache;
use tour_core::{
    DocumentCache, DocumentId, DocumentResolver, PassStatus, ResolveError, SyncStatus,
};
use tour_remote::RestDocumentResolver;
use tour_sync::{NetworkObserver, SyncCoordinator, SyncSettings};

fn resolver(backend: &TestBackend) -> RestDocumentResolver {
    let config = backend.config(&[]).unwrap();
    RestDocumentResolver::new(config.require_remote().unwrap()).unwrap()
}

// ============================================================================
// Resolver Tests
// ============================================================================

#[tokio::test]
async fn test_resolve_signs_document_url() {
    let backend = TestBackend::start().await.expect("Failed to start backend");
    backend.insert_row(DocumentRow::new("doc-1", 1_700_000_000));

    let metadata = resolver(&backend)
        .resolve(&DocumentId::from("doc-1"))
        .await
        .unwrap();

    assert_eq!(metadata.updated_at.timestamp(), 1_700_000_000);
    assert_eq!(
        metadata.url,
        format!(
            "{}/storage/v1/object/sign/documents/trips/doc-1.pdf?token=signed",
            backend.base_url()
        )
    );
}

#[tokio::test]
async fn test_resolve_missing_row_is_not_found() {
    let backend = TestBackend::start().await.expect("Failed to start backend");

    let err = resolver(&backend)
        .resolve(&DocumentId::from("ghost"))
        .await
        .unwrap_err();
    assert_eq!(err, ResolveError::NotFound);
    assert_eq!(backend.lookups(), 1);
}

#[tokio::test]
async fn test_resolve_signing_failure() {
    let backend = TestBackend::start().await.expect("Failed to start backend");
    backend.insert_row(DocumentRow::new("doc-1", 1));
    backend.set_fail_signing(true);

    let err = resolver(&backend)
        .resolve(&DocumentId::from("doc-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Signing(_)));
}

#[tokio::test]
async fn test_wrong_api_key_is_lookup_failure() {
    let backend = TestBackend::start().await.expect("Failed to start backend");
    backend.insert_row(DocumentRow::new("doc-1", 1));

    let mut config = backend.config(&[]).unwrap();
    if let Some(remote) = config.remote.as_mut() {
        remote.api_key = "wrong".to_string();
    }
    let resolver = RestDocumentResolver::new(config.require_remote().unwrap()).unwrap();

    let err = resolver.resolve(&DocumentId::from("doc-1")).await.unwrap_err();
    assert_eq!(err, ResolveError::Lookup("backend returned 401 Unauthorized".to_string()));
}

// ============================================================================
// Sync Pass Tests
// ============================================================================

#[tokio::test]
async fn test_sync_pass_over_file_cache() {
    let backend = TestBackend::start().await.expect("Failed to start backend");
    backend.insert_row(DocumentRow::new("A", 1_700_000_100));

    let path = temp_cache_path();
    let cache = Arc::new(FileDocumentCache::new(&path));
    cache.upsert(&stale_document("A")).await.unwrap();
    cache.upsert(&stale_document("B")).await.unwrap();

    let coordinator = SyncCoordinator::new(
        cache.clone(),
        Arc::new(resolver(&backend)),
        SyncSettings::default(),
    );

    let report = coordinator.sync().await;
    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.result.updated, vec![DocumentId::from("A")]);
    assert_eq!(
        report.result.failed_ids().cloned().collect::<Vec<_>>(),
        vec![DocumentId::from("B")]
    );

    // State survives a restart
    let reopened = FileDocumentCache::new(&path);
    let a = reopened.get(&DocumentId::from("A")).await.unwrap().unwrap();
    assert_eq!(a.status, SyncStatus::Synced);
    assert_eq!(a.updated_at.timestamp(), 1_700_000_100);
    assert!(a.url.ends_with("trips/A.pdf?token=signed"));

    let b = reopened.get(&DocumentId::from("B")).await.unwrap().unwrap();
    assert_eq!(b.status, SyncStatus::Pending);
    assert_eq!(b.url, "blob:B");

    tokio::fs::remove_dir_all(path.parent().unwrap()).await.ok();
}

#[tokio::test]
async fn test_reconnect_through_observer() {
    let backend = TestBackend::start().await.expect("Failed to start backend");
    backend.insert_row(DocumentRow::new("A", 42));

    let path = temp_cache_path();
    let cache = Arc::new(FileDocumentCache::new(&path));
    cache.upsert(&stale_document("A")).await.unwrap();

    let coordinator = Arc::new(SyncCoordinator::new(
        cache,
        Arc::new(resolver(&backend)),
        SyncSettings::default().with_settle_delay(Duration::from_millis(50)),
    ));
    let observer = NetworkObserver::new(coordinator, false);
    let mut reports = observer.reports();

    observer.set_online(true);
    let report = tokio::time::timeout(Duration::from_secs(10), reports.recv())
        .await
        .expect("no sync report")
        .unwrap();

    assert_eq!(report.summary(), "1 offline document(s) synced");
    assert!(!observer.coordinator().is_syncing());

    tokio::fs::remove_dir_all(path.parent().unwrap()).await.ok();
}

// ============================================================================
// Agent Tests
// ============================================================================

#[tokio::test]
async fn test_agent_syncs_on_first_probe() {
    let backend = TestBackend::start().await.expect("Failed to start backend");
    backend.insert_row(DocumentRow::new("A", 7));

    let path = temp_cache_path();
    FileDocumentCache::new(&path)
        .upsert(&stale_document("A"))
        .await
        .unwrap();

    let path_str = path.display().to_string();
    let config = backend
        .config(&[
            ("OFFLINE_CACHE_PATH", path_str.as_str()),
            ("SYNC_SETTLE_DELAY_MS", "20"),
            ("CONNECTIVITY_PROBE_INTERVAL_MS", "50"),
        ])
        .unwrap();

    let agent = tour_agent::Agent::build(&config).unwrap();
    let mut reports = agent.observer().reports();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(agent.run_until(async {
        stop_rx.await.ok();
    }));

    let report = tokio::time::timeout(Duration::from_secs(10), reports.recv())
        .await
        .expect("no sync report")
        .unwrap();
    assert_eq!(report.result.updated, vec![DocumentId::from("A")]);

    stop_tx.send(()).ok();
    running.await.unwrap().unwrap();

    let synced = FileDocumentCache::new(&path)
        .get(&DocumentId::from("A"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(synced.status, SyncStatus::Synced);

    tokio::fs::remove_dir_all(path.parent().unwrap()).await.ok();
}
