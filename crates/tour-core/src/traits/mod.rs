//! Traits (ports) implemented by the infrastructure crates

mod ports;

pub use ports::{
    CacheResult, DocumentCache, DocumentResolver, DocumentUpdate, PresenceChannel,
    PresenceResult, PresenceSubscription, PresenceTransport,
};
