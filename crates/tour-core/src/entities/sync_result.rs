//! Outcome of one sync pass

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::value_objects::DocumentId;

/// A document that could not be refreshed, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub id: DocumentId,
    pub reason: String,
}

/// Per-document outcomes of a sync pass
///
/// `updated` and `errors` partition the set of documents the pass attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub updated: Vec<DocumentId>,
    pub errors: Vec<SyncFailure>,
}

impl SyncResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_updated(&mut self, id: DocumentId) {
        self.updated.push(id);
    }

    pub fn record_failure(&mut self, id: DocumentId, reason: impl Into<String>) {
        self.errors.push(SyncFailure {
            id,
            reason: reason.into(),
        });
    }

    /// Number of documents attempted
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.updated.len() + self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.errors.is_empty()
    }

    /// Ids of the documents that failed
    pub fn failed_ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.errors.iter().map(|f| &f.id)
    }

    /// Sort both sequences by document id
    pub fn sort(&mut self) {
        self.updated.sort();
        self.errors.sort_by(|a, b| a.id.cmp(&b.id));
    }

    /// One-line aggregate suitable for a user notification
    #[must_use]
    pub fn summary(&self) -> String {
        match (self.updated.len(), self.errors.len()) {
            (0, 0) => "No offline documents to sync".to_string(),
            (updated, 0) => format!("{updated} offline document(s) synced"),
            (0, failed) => format!("{failed} offline document(s) failed to sync"),
            (updated, failed) => {
                format!("{updated} offline document(s) synced, {failed} failed")
            }
        }
    }
}

/// How a sync pass ended, independent of per-document outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassStatus {
    /// Every candidate document was attempted
    Completed,
    /// The cache held no document eligible for sync
    NothingToSync,
    /// The pass could not run (e.g. cache unreachable)
    Aborted { reason: String },
    /// Another pass was already in flight; nothing was attempted
    AlreadyRunning,
}

/// Report handed to the caller after a sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub status: PassStatus,
    pub result: SyncResult,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn completed(result: SyncResult, started_at: DateTime<Utc>) -> Self {
        Self::finish(PassStatus::Completed, result, started_at)
    }

    pub fn nothing_to_sync(started_at: DateTime<Utc>) -> Self {
        Self::finish(PassStatus::NothingToSync, SyncResult::new(), started_at)
    }

    pub fn aborted(reason: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self::finish(
            PassStatus::Aborted {
                reason: reason.into(),
            },
            SyncResult::new(),
            started_at,
        )
    }

    pub fn already_running() -> Self {
        Self::finish(PassStatus::AlreadyRunning, SyncResult::new(), Utc::now())
    }

    fn finish(status: PassStatus, result: SyncResult, started_at: DateTime<Utc>) -> Self {
        Self {
            status,
            result,
            started_at,
            finished_at: Utc::now(),
        }
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, PassStatus::Aborted { .. })
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == PassStatus::Completed
    }

    /// Notification text for this pass
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.status {
            PassStatus::Aborted { reason } => format!("Offline sync failed: {reason}"),
            PassStatus::AlreadyRunning => "Offline sync already in progress".to_string(),
            PassStatus::Completed | PassStatus::NothingToSync => self.result.summary(),
        }
    }
}
