//! # tour-cache
//!
//! Local storage for offline documents and the presence channels used for
//! typing indicators.
//!
//! ## Features
//!
//! - **Document caches**: in-memory and JSON-file implementations of `DocumentCache`
//! - **Local presence**: in-process presence hub for single-process deployments and tests
//! - **Redis presence**: presence state in Redis hashes, change notifications over Pub/Sub
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//!
//! ## Example
//!
//! ```ignore
//! use tour_cache::{FileDocumentCache, LocalPresenceHub};
//!
//! let cache = FileDocumentCache::new("./offline-documents.json");
//! let documents = cache.list_all().await?;
//!
//! let hub = LocalPresenceHub::new();
//! let channel = hub.join("typing:conversation-1", "user-1").await?;
//! channel.track(PresenceRecord::idle(&user_id)).await?;
//! ```

pub mod documents;
pub mod pool;
pub mod presence;
pub mod pubsub;

// Re-export document cache types
pub use documents::{FileDocumentCache, MemoryDocumentCache};

// Re-export pool types
pub use pool::{
    create_shared_pool, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool,
};

// Re-export presence types
pub use presence::{LocalPresenceHub, RedisPresenceTransport};

// Re-export pubsub types
pub use pubsub::{
    PubSubChannel, PubSubEvent, Publisher, ReceivedMessage, Subscriber, SubscriberBuilder,
    SubscriberConfig, SubscriberError, SubscriberResult, PRESENCE_CHANNEL_PREFIX,
};
