//! Cached document entity - a document saved locally for offline access

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;
use crate::value_objects::DocumentId;

/// Sync status of a cached document
///
/// Only `Pending -> Synced` and `Pending -> Error` are real transitions.
/// `Synced -> Synced` is allowed so a later pass can refresh an already synced
/// entry. Nothing ever returns to `Pending`, and `Error` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
    Error,
}

impl SyncStatus {
    /// Check whether moving to `next` is permitted
    #[must_use]
    pub fn can_transition_to(self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Synced) | (Self::Pending, Self::Error) | (Self::Synced, Self::Synced)
        )
    }

    /// Terminal documents are never attempted by a sync pass
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Synced => write!(f, "synced"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid sync status: {s}")),
        }
    }
}

/// Remote metadata for a document, as returned by a resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Last update timestamp in the remote store
    pub updated_at: DateTime<Utc>,
    /// Resolved (usually signed) access URL
    pub url: String,
}

impl DocumentMetadata {
    pub fn new(updated_at: DateTime<Utc>, url: impl Into<String>) -> Self {
        Self {
            updated_at,
            url: url.into(),
        }
    }
}

/// Document cached locally for offline use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDocument {
    pub id: DocumentId,
    pub updated_at: DateTime<Utc>,
    pub url: String,
    pub status: SyncStatus,
    /// When the document was first saved offline
    pub saved_at: DateTime<Utc>,
    /// Reason recorded when the document was marked as failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CachedDocument {
    /// Create a new pending entry (first offline save)
    pub fn pending(id: DocumentId, metadata: DocumentMetadata) -> Self {
        Self {
            id,
            updated_at: metadata.updated_at,
            url: metadata.url,
            status: SyncStatus::Pending,
            saved_at: Utc::now(),
            error: None,
        }
    }

    /// Apply freshly resolved remote metadata and mark the entry synced
    pub fn apply_refresh(&mut self, metadata: DocumentMetadata) -> Result<(), DomainError> {
        self.transition(SyncStatus::Synced)?;
        self.updated_at = metadata.updated_at;
        self.url = metadata.url;
        Ok(())
    }

    /// Mark a pending entry as permanently failed
    pub fn mark_error(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.transition(SyncStatus::Error)?;
        self.error = Some(reason.into());
        Ok(())
    }

    /// Replace the locally saved copy without changing the sync status
    pub fn replace_local(&mut self, metadata: DocumentMetadata) {
        self.updated_at = metadata.updated_at;
        self.url = metadata.url;
    }

    #[inline]
    pub fn is_synced(&self) -> bool {
        self.status == SyncStatus::Synced
    }

    fn transition(&mut self, next: SyncStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
