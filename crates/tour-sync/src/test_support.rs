//! Collaborator fakes shared by the coordinator tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tour_cache::MemoryDocumentCache;
use tour_core::{
    CacheError, CacheResult, CachedDocument, DocumentCache, DocumentId, DocumentMetadata,
    DocumentResolver, DocumentUpdate, ResolveError,
};

pub fn metadata(secs: i64, url: &str) -> DocumentMetadata {
    DocumentMetadata::new(Utc.timestamp_opt(secs, 0).unwrap(), url)
}

pub fn pending(id: &str) -> CachedDocument {
    CachedDocument::pending(DocumentId::from(id), metadata(0, &format!("local-{id}")))
}

pub fn ids(values: &[&str]) -> Vec<DocumentId> {
    values.iter().map(|v| DocumentId::from(*v)).collect()
}

/// Resolver answering from a fixed table; unknown ids are `NotFound`
#[derive(Default)]
pub struct ScriptedResolver {
    answers: Mutex<HashMap<DocumentId, Result<DocumentMetadata, ResolveError>>>,
    calls: AtomicUsize,
    log: Mutex<Vec<DocumentId>>,
    /// When set, every call waits for a permit first
    gate: Option<Arc<Semaphore>>,
    delay: Option<Duration>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn answer(self, id: &str, answer: Result<DocumentMetadata, ResolveError>) -> Self {
        self.answers.lock().insert(DocumentId::from(id), answer);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<DocumentId> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl DocumentResolver for ScriptedResolver {
    async fn resolve(&self, id: &DocumentId) -> Result<DocumentMetadata, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(id.clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.answers
            .lock()
            .get(id)
            .cloned()
            .unwrap_or(Err(ResolveError::NotFound))
    }
}

/// Cache whose storage is unreachable
pub struct UnreachableCache;

#[async_trait]
impl DocumentCache for UnreachableCache {
    async fn list_all(&self) -> CacheResult<Vec<CachedDocument>> {
        Err(CacheError::Unavailable("storage offline".to_string()))
    }

    async fn get(&self, _id: &DocumentId) -> CacheResult<Option<CachedDocument>> {
        Err(CacheError::Unavailable("storage offline".to_string()))
    }

    async fn upsert(&self, _document: &CachedDocument) -> CacheResult<()> {
        Err(CacheError::Unavailable("storage offline".to_string()))
    }

    async fn remove(&self, _id: &DocumentId) -> CacheResult<bool> {
        Err(CacheError::Unavailable("storage offline".to_string()))
    }
}

/// Memory cache refusing writes for one document
pub struct RejectingCache {
    pub inner: MemoryDocumentCache,
    pub reject: DocumentId,
}

#[async_trait]
impl DocumentCache for RejectingCache {
    async fn list_all(&self) -> CacheResult<Vec<CachedDocument>> {
        self.inner.list_all().await
    }

    async fn get(&self, id: &DocumentId) -> CacheResult<Option<CachedDocument>> {
        self.inner.get(id).await
    }

    async fn upsert(&self, document: &CachedDocument) -> CacheResult<()> {
        if document.id == self.reject {
            return Err(CacheError::Unavailable("disk full".to_string()));
        }
        self.inner.upsert(document).await
    }

    async fn remove(&self, id: &DocumentId) -> CacheResult<bool> {
        self.inner.remove(id).await
    }

    async fn update(
        &self,
        id: &DocumentId,
        change: DocumentUpdate,
    ) -> CacheResult<Option<CachedDocument>> {
        if *id == self.reject {
            return Err(CacheError::Unavailable("disk full".to_string()));
        }
        self.inner.update(id, change).await
    }
}
