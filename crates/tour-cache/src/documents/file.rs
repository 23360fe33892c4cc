//! JSON-file document cache.
//!
//! Keeps the offline document list in a single JSON file so it survives
//! process restarts. Every write replaces the file atomically (temp file +
//! rename).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tour_core::{CacheResult, CachedDocument, DocumentCache, DocumentId, DocumentUpdate};

/// Current on-disk format version
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    documents: Vec<CachedDocument>,
}

type DocumentMap = HashMap<DocumentId, CachedDocument>;

/// Document cache persisted to a JSON file
#[derive(Debug)]
pub struct FileDocumentCache {
    path: PathBuf,
    /// Loaded lazily on first access; the lock also serializes writes
    documents: Mutex<Option<DocumentMap>>,
}

impl FileDocumentCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            documents: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> CacheResult<DocumentMap> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No offline cache file yet");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: CacheFile = serde_json::from_slice(&raw)?;
        if file.version != FORMAT_VERSION {
            return Err(tour_core::CacheError::Unavailable(format!(
                "unsupported cache format version {}",
                file.version
            )));
        }

        tracing::debug!(
            path = %path.display(),
            documents = file.documents.len(),
            "Loaded offline cache"
        );

        Ok(file
            .documents
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect())
    }

    async fn persist(&self, documents: &DocumentMap) -> CacheResult<()> {
        let mut list: Vec<_> = documents.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        let payload = serde_json::to_vec_pretty(&CacheFile {
            version: FORMAT_VERSION,
            documents: list,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        Ok(())
    }

    /// Run `f` against the loaded map, loading it from disk first if needed
    async fn with_documents<T>(
        &self,
        f: impl FnOnce(&mut DocumentMap) -> T,
    ) -> CacheResult<(T, DocumentMap)> {
        let mut guard = self.documents.lock().await;
        if guard.is_none() {
            *guard = Some(Self::load(&self.path).await?);
        }
        let documents = guard.get_or_insert_with(HashMap::new);
        let out = f(documents);
        Ok((out, documents.clone()))
    }
}

#[async_trait]
impl DocumentCache for FileDocumentCache {
    async fn list_all(&self) -> CacheResult<Vec<CachedDocument>> {
        let ((), documents) = self.with_documents(|_| ()).await?;
        let mut list: Vec<_> = documents.into_values().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list)
    }

    async fn get(&self, id: &DocumentId) -> CacheResult<Option<CachedDocument>> {
        let (found, _) = self.with_documents(|docs| docs.get(id).cloned()).await?;
        Ok(found)
    }

    async fn upsert(&self, document: &CachedDocument) -> CacheResult<()> {
        let mut guard = self.documents.lock().await;
        if guard.is_none() {
            *guard = Some(Self::load(&self.path).await?);
        }
        let documents = guard.get_or_insert_with(HashMap::new);

        let previous = documents.insert(document.id.clone(), document.clone());
        if let Err(e) = self.persist(documents).await {
            // Keep memory consistent with disk
            match previous {
                Some(prev) => documents.insert(prev.id.clone(), prev),
                None => documents.remove(&document.id),
            };
            return Err(e);
        }

        tracing::trace!(document_id = %document.id, status = %document.status, "Cached document persisted");
        Ok(())
    }

    async fn remove(&self, id: &DocumentId) -> CacheResult<bool> {
        let mut guard = self.documents.lock().await;
        if guard.is_none() {
            *guard = Some(Self::load(&self.path).await?);
        }
        let documents = guard.get_or_insert_with(HashMap::new);

        let Some(previous) = documents.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(documents).await {
            documents.insert(previous.id.clone(), previous);
            return Err(e);
        }
        Ok(true)
    }

    async fn update(
        &self,
        id: &DocumentId,
        change: DocumentUpdate,
    ) -> CacheResult<Option<CachedDocument>> {
        let mut guard = self.documents.lock().await;
        if guard.is_none() {
            *guard = Some(Self::load(&self.path).await?);
        }
        let documents = guard.get_or_insert_with(HashMap::new);

        let Some(current) = documents.get(id) else {
            return Ok(None);
        };
        let mut next = current.clone();
        change(&mut next)?;

        let previous = documents.insert(id.clone(), next.clone());
        if let Err(e) = self.persist(documents).await {
            if let Some(prev) = previous {
                documents.insert(prev.id.clone(), prev);
            }
            return Err(e);
        }
        Ok(Some(next))
    }
}
