//! Offline document storage.
//!
//! Implementations of `DocumentCache` for the documents a user saved for
//! offline access.

mod file;
mod memory;

pub use file::FileDocumentCache;
pub use memory::MemoryDocumentCache;
