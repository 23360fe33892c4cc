//! Domain entities - core business objects

mod document;
mod presence;
mod sync_result;

pub use document::{CachedDocument, DocumentMetadata, SyncStatus};
pub use presence::{PresenceRecord, PresenceState, TypingUser};
pub use sync_result::{PassStatus, SyncFailure, SyncReport, SyncResult};
