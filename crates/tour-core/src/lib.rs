//! # tour-core
//!
//! Domain layer for the offline document sync and typing presence subsystems:
//! entities, identifiers, error types, and the traits (ports) implemented by
//! the cache, remote, and presence infrastructure crates.

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    CachedDocument, DocumentMetadata, PassStatus, PresenceRecord, PresenceState, SyncFailure,
    SyncReport, SyncResult, SyncStatus, TypingUser,
};
pub use error::{CacheError, DomainError, PresenceError, ResolveError};
pub use traits::{
    CacheResult, DocumentCache, DocumentResolver, DocumentUpdate, PresenceChannel,
    PresenceResult, PresenceSubscription, PresenceTransport,
};
pub use value_objects::{ConversationId, DocumentId, UserId};
