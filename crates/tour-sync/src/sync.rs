//! Offline sync coordinator.
//!
//! One sync pass walks the local document cache and refreshes every entry
//! from the remote store through a [`DocumentResolver`]. A pass never fails
//! into the caller: per-document failures end up in `SyncResult::errors` and
//! a pass that cannot run at all is reported as `PassStatus::Aborted`.
//!
//! State machine: `idle -> syncing -> idle`. At most one pass is in flight;
//! a pass requested meanwhile returns `PassStatus::AlreadyRunning` without
//! touching any document.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tour_core::{
    CachedDocument, DocumentCache, DocumentId, DocumentMetadata, DocumentResolver, ResolveError,
    SyncReport, SyncResult,
};

use crate::settings::SyncSettings;

pub struct SyncCoordinator {
    cache: Arc<dyn DocumentCache>,
    resolver: Arc<dyn DocumentResolver>,
    settings: SyncSettings,
    in_flight: AtomicBool,
    syncing_tx: watch::Sender<bool>,
}

/// Returns the coordinator to `idle` when a pass ends, including when the
/// pass future is dropped halfway
struct InFlightGuard<'a> {
    coordinator: &'a SyncCoordinator,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.in_flight.store(false, Ordering::Release);
        self.coordinator.syncing_tx.send_replace(false);
    }
}

impl SyncCoordinator {
    pub fn new(
        cache: Arc<dyn DocumentCache>,
        resolver: Arc<dyn DocumentResolver>,
        settings: SyncSettings,
    ) -> Self {
        let (syncing_tx, _) = watch::channel(false);
        Self {
            cache,
            resolver,
            settings,
            in_flight: AtomicBool::new(false),
            syncing_tx,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Whether a pass is currently in flight
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Observe `is_syncing` transitions
    #[must_use]
    pub fn subscribe_syncing(&self) -> watch::Receiver<bool> {
        self.syncing_tx.subscribe()
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return None;
        }
        self.syncing_tx.send_replace(true);
        Some(InFlightGuard { coordinator: self })
    }

    /// Run one sync pass over the whole cache
    #[tracing::instrument(skip(self))]
    pub async fn sync(&self) -> SyncReport {
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("Sync pass already in flight, ignoring request");
            return SyncReport::already_running();
        };
        let started_at = Utc::now();

        let documents = match self.cache.list_all().await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::error!(error = %e, "Offline sync aborted: cache unreachable");
                return SyncReport::aborted(e.to_string(), started_at);
            }
        };

        let candidates = Self::candidates(documents);
        if candidates.is_empty() {
            tracing::debug!("No offline documents to sync");
            return SyncReport::nothing_to_sync(started_at);
        }

        tracing::info!(documents = candidates.len(), "Offline sync started");

        let outcomes: Vec<(DocumentId, Result<(), String>)> = stream::iter(candidates)
            .map(|document| self.refresh(document.id))
            .buffer_unordered(self.settings.max_concurrent_resolves.max(1))
            .collect()
            .await;

        let mut result = SyncResult::new();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => result.record_updated(id),
                Err(reason) => result.record_failure(id, reason),
            }
        }
        result.sort();

        tracing::info!(
            updated = result.updated.len(),
            failed = result.errors.len(),
            "Offline sync finished"
        );

        SyncReport::completed(result, started_at)
    }

    /// Wait for the settle delay, then run a pass.
    ///
    /// Returns `None` without syncing when `online` turns false (or its
    /// sender goes away) before the pass starts. A pass still in flight when
    /// the delay ends is waited for, so the request is queued rather than
    /// dropped.
    pub async fn sync_after_settle(&self, mut online: watch::Receiver<bool>) -> Option<SyncReport> {
        if !*online.borrow_and_update() {
            return None;
        }

        let settle = tokio::time::sleep(self.settings.settle_delay);
        tokio::pin!(settle);
        loop {
            tokio::select! {
                () = &mut settle => break,
                changed = online.changed() => {
                    if changed.is_err() || !*online.borrow_and_update() {
                        tracing::debug!("Connectivity lost during settle delay, sync skipped");
                        return None;
                    }
                }
            }
        }

        // Queue behind a running pass, still giving up if connectivity drops
        let mut syncing = self.syncing_tx.subscribe();
        while *syncing.borrow_and_update() {
            tokio::select! {
                changed = syncing.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
                changed = online.changed() => {
                    if changed.is_err() || !*online.borrow_and_update() {
                        tracing::debug!("Connectivity lost while waiting for running pass, sync skipped");
                        return None;
                    }
                }
            }
        }

        // The settle timer may have won the race against an offline change
        if !*online.borrow_and_update() {
            tracing::debug!("Connectivity lost before sync pass, sync skipped");
            return None;
        }

        Some(self.sync().await)
    }

    /// Drop terminal entries and repeated ids
    fn candidates(documents: Vec<CachedDocument>) -> Vec<CachedDocument> {
        let mut seen = HashSet::with_capacity(documents.len());
        documents
            .into_iter()
            .filter(|doc| !doc.status.is_terminal())
            .filter(|doc| seen.insert(doc.id.clone()))
            .collect()
    }

    async fn resolve(&self, id: &DocumentId) -> Result<DocumentMetadata, ResolveError> {
        match self.settings.resolve_timeout {
            Some(limit) => tokio::time::timeout(limit, self.resolver.resolve(id))
                .await
                .unwrap_or_else(|_| {
                    let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    Err(ResolveError::Timeout(millis))
                }),
            None => self.resolver.resolve(id).await,
        }
    }

    /// Refresh one document; the cache entry is only written on success.
    ///
    /// The refresh is applied to the entry as it is after resolution, so a
    /// document failed or removed meanwhile is reported, never resurrected.
    async fn refresh(&self, id: DocumentId) -> (DocumentId, Result<(), String>) {
        let metadata = match self.resolve(&id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(document_id = %id, error = %e, "Document refresh failed");
                return (id, Err(e.to_string()));
            }
        };

        let stored = self
            .cache
            .update(&id, Box::new(move |document| document.apply_refresh(metadata)))
            .await;

        match stored {
            Ok(Some(_)) => {
                tracing::debug!(document_id = %id, "Document synced");
                (id, Ok(()))
            }
            Ok(None) => {
                tracing::warn!(document_id = %id, "Document removed from cache during sync");
                (id, Err("document removed from cache during sync".to_string()))
            }
            Err(e) => {
                tracing::warn!(document_id = %id, error = %e, "Failed to store refreshed document");
                (id, Err(e.to_string()))
            }
        }
    }
}
