//! Test fixtures and data generators

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tour_core::{CachedDocument, DocumentId, DocumentMetadata};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A row of the backend's documents table
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRow {
    pub id: String,
    pub updated_at: DateTime<Utc>,
    pub file_path: String,
}

impl DocumentRow {
    pub fn new(id: &str, updated_secs: i64) -> Self {
        Self {
            id: id.to_string(),
            updated_at: Utc.timestamp_opt(updated_secs, 0).unwrap(),
            file_path: format!("trips/{id}.pdf"),
        }
    }
}

/// A document saved offline before the remote copy changed
pub fn stale_document(id: &str) -> CachedDocument {
    CachedDocument::pending(
        DocumentId::from(id),
        DocumentMetadata::new(Utc.timestamp_opt(0, 0).unwrap(), format!("blob:{id}")),
    )
}

/// Unique conversation id so Redis tests do not collide
pub fn unique_conversation() -> String {
    format!("conv-{}-{}", uuid::Uuid::new_v4(), unique_suffix())
}
