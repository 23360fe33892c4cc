//! Presence channel transports.
//!
//! Both transports deliver the full channel state to subscribers after every
//! change, so a consumer never has to merge deltas.

mod local;
mod redis_presence;

pub use local::LocalPresenceHub;
pub use redis_presence::{RedisPresenceTransport, PRESENCE_KEY_PREFIX, PRESENCE_TTL};
