//! Errors reported by the external collaborators (resolver, cache, presence)

use thiserror::Error;

use super::DomainError;

/// Why a single document could not be refreshed from the remote store.
///
/// Every variant is contained by the sync coordinator and reported through
/// `SyncResult::errors`; none of them aborts a pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("document not found remotely")]
    NotFound,

    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("signing access url failed: {0}")]
    Signing(String),

    #[error("resolution timed out after {0} ms")]
    Timeout(u64),
}

/// Local document cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Presence channel transport errors
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("Failed to join presence channel {topic}: {reason}")]
    Join { topic: String, reason: String },

    #[error("Failed to track presence: {0}")]
    Track(String),

    #[error("Presence channel closed")]
    Closed,

    #[error("Presence transport error: {0}")]
    Transport(String),
}
