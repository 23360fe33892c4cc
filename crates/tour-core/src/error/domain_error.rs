//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::entities::SyncStatus;
use crate::value_objects::DocumentId;

/// Domain layer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Invalid sync status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: DocumentId,
        from: SyncStatus,
        to: SyncStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Get an error code string for logs and notifications
    pub fn code(&self) -> &'static str {
        match self {
            Self::DocumentNotFound(_) => "UNKNOWN_DOCUMENT",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DocumentNotFound(_))
    }
}
