//! In-memory document cache.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tour_core::{CacheResult, CachedDocument, DocumentCache, DocumentId, DocumentUpdate};

/// Document cache held in process memory
#[derive(Debug, Default)]
pub struct MemoryDocumentCache {
    documents: RwLock<HashMap<DocumentId, CachedDocument>>,
}

impl MemoryDocumentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-populated with `documents`
    pub fn with_documents(documents: impl IntoIterator<Item = CachedDocument>) -> Self {
        let documents = documents
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();
        Self {
            documents: RwLock::new(documents),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl DocumentCache for MemoryDocumentCache {
    async fn list_all(&self) -> CacheResult<Vec<CachedDocument>> {
        let mut documents: Vec<_> = self.documents.read().values().cloned().collect();
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }

    async fn get(&self, id: &DocumentId) -> CacheResult<Option<CachedDocument>> {
        Ok(self.documents.read().get(id).cloned())
    }

    async fn upsert(&self, document: &CachedDocument) -> CacheResult<()> {
        self.documents
            .write()
            .insert(document.id.clone(), document.clone());
        tracing::trace!(document_id = %document.id, status = %document.status, "Cached document upserted");
        Ok(())
    }

    async fn remove(&self, id: &DocumentId) -> CacheResult<bool> {
        Ok(self.documents.write().remove(id).is_some())
    }

    async fn update(
        &self,
        id: &DocumentId,
        change: DocumentUpdate,
    ) -> CacheResult<Option<CachedDocument>> {
        let mut documents = self.documents.write();
        let Some(current) = documents.get_mut(id) else {
            return Ok(None);
        };
        let mut next = current.clone();
        change(&mut next)?;
        *current = next.clone();
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tour_core::{DocumentMetadata, SyncStatus};

    #[tokio::test]
    async fn test_upsert_and_list_sorted() {
        let cache = MemoryDocumentCache::new();
        assert!(cache.is_empty());

        cache
            .save_offline(DocumentId::from("b"), DocumentMetadata::new(Utc::now(), "u-b"))
            .await
            .unwrap();
        cache
            .save_offline(DocumentId::from("a"), DocumentMetadata::new(Utc::now(), "u-a"))
            .await
            .unwrap();

        let ids: Vec<_> = cache
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![DocumentId::from("a"), DocumentId::from("b")]);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_and_mark_error() {
        let doc = CachedDocument::pending(
            DocumentId::from("a"),
            DocumentMetadata::new(Utc::now(), "u"),
        );
        let cache = MemoryDocumentCache::with_documents([doc]);

        let failed = cache.mark_error(&DocumentId::from("a"), "deleted").await.unwrap();
        assert_eq!(failed.status, SyncStatus::Error);

        let refresh = cache
            .update(
                &DocumentId::from("a"),
                Box::new(|doc| doc.apply_refresh(DocumentMetadata::new(Utc::now(), "v2"))),
            )
            .await;
        assert!(refresh.is_err());
        let kept = cache.get(&DocumentId::from("a")).await.unwrap().unwrap();
        assert_eq!(kept.status, SyncStatus::Error);
        assert_eq!(kept.error.as_deref(), Some("deleted"));

        assert!(cache.remove(&DocumentId::from("a")).await.unwrap());
        assert!(!cache.remove(&DocumentId::from("a")).await.unwrap());
        assert!(cache.get(&DocumentId::from("a")).await.unwrap().is_none());
    }
}
