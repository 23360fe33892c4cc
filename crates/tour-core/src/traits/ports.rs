//! Collaborator traits (ports) - the interfaces the coordinators depend on
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation: `tour-cache` for the local document cache and
//! presence transports, `tour-remote` for document resolution.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::entities::{CachedDocument, DocumentMetadata, PresenceRecord, PresenceState};
use crate::error::{CacheError, DomainError, PresenceError, ResolveError};
use crate::value_objects::DocumentId;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Change applied to a cached document by [`DocumentCache::update`]
pub type DocumentUpdate =
    Box<dyn FnOnce(&mut CachedDocument) -> Result<(), DomainError> + Send>;

/// Result type for presence operations
pub type PresenceResult<T> = Result<T, PresenceError>;

// ============================================================================
// Remote Document Lookup
// ============================================================================

#[async_trait]
pub trait DocumentResolver: Send + Sync {
    /// Fetch the current remote metadata of a document.
    ///
    /// Implementations catch every underlying failure (identity, lookup,
    /// URL signing) and report it as a `ResolveError`.
    async fn resolve(&self, id: &DocumentId) -> Result<DocumentMetadata, ResolveError>;
}

// ============================================================================
// Local Document Cache
// ============================================================================

#[async_trait]
pub trait DocumentCache: Send + Sync {
    /// List every cached document
    async fn list_all(&self) -> CacheResult<Vec<CachedDocument>>;

    /// Find a cached document by id
    async fn get(&self, id: &DocumentId) -> CacheResult<Option<CachedDocument>>;

    /// Insert or replace a cached document
    async fn upsert(&self, document: &CachedDocument) -> CacheResult<()>;

    /// Remove a cached document, returning whether it existed
    async fn remove(&self, id: &DocumentId) -> CacheResult<bool>;

    /// Save a document for offline use.
    ///
    /// The first save creates a `pending` entry. Saving again replaces the
    /// local copy and keeps the current sync status.
    async fn save_offline(
        &self,
        id: DocumentId,
        metadata: DocumentMetadata,
    ) -> CacheResult<CachedDocument> {
        let document = match self.get(&id).await? {
            Some(mut existing) => {
                existing.replace_local(metadata);
                existing
            }
            None => CachedDocument::pending(id, metadata),
        };
        self.upsert(&document).await?;
        Ok(document)
    }

    /// Apply `change` to the current entry and store the result.
    ///
    /// Returns `None` when the document is not cached. When `change` fails
    /// the entry is left as it was. This default reads and then writes;
    /// implementations that own a lock override it so no other writer can
    /// slip in between.
    async fn update(
        &self,
        id: &DocumentId,
        change: DocumentUpdate,
    ) -> CacheResult<Option<CachedDocument>> {
        let Some(mut document) = self.get(id).await? else {
            return Ok(None);
        };
        change(&mut document)?;
        self.upsert(&document).await?;
        Ok(Some(document))
    }

    /// Mark a pending document as permanently failed
    async fn mark_error(&self, id: &DocumentId, reason: &str) -> CacheResult<CachedDocument> {
        let reason = reason.to_string();
        self.update(id, Box::new(move |document| document.mark_error(reason)))
            .await?
            .ok_or_else(|| DomainError::DocumentNotFound(id.clone()).into())
    }
}

// ============================================================================
// Presence Channel
// ============================================================================

/// Subscription to presence-sync notifications of one channel.
///
/// Each notification carries the full channel state. Dropping the value
/// disposes the subscription.
pub struct PresenceSubscription {
    receiver: broadcast::Receiver<PresenceState>,
}

impl PresenceSubscription {
    pub fn new(receiver: broadcast::Receiver<PresenceState>) -> Self {
        Self { receiver }
    }

    /// Wait for the next state notification.
    ///
    /// Lagged notifications are skipped since every notification is a full
    /// snapshot. Returns `None` once the channel is closed.
    pub async fn next(&mut self) -> Option<PresenceState> {
        loop {
            match self.receiver.recv().await {
                Ok(state) => return Some(state),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[async_trait]
pub trait PresenceChannel: Send + Sync {
    /// Channel (topic) name
    fn topic(&self) -> &str;

    /// Presence key this member announces under
    fn presence_key(&self) -> &str;

    /// Subscribe to presence-sync notifications
    fn subscribe(&self) -> PresenceSubscription;

    /// Announce this member's record
    async fn track(&self, record: PresenceRecord) -> PresenceResult<()>;

    /// Current channel state
    async fn state(&self) -> PresenceResult<PresenceState>;

    /// Leave the channel, removing this member's record
    async fn unsubscribe(&self) -> PresenceResult<()>;
}

#[async_trait]
pub trait PresenceTransport: Send + Sync {
    /// Join `topic`, announcing under `presence_key`
    async fn join(&self, topic: &str, presence_key: &str)
        -> PresenceResult<Arc<dyn PresenceChannel>>;
}
