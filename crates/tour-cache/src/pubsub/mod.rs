//! Redis Pub/Sub module.
//!
//! Carries presence-sync notifications between processes sharing a Redis
//! instance.

mod channels;
mod publisher;
mod subscriber;

pub use channels::{PubSubChannel, PRESENCE_CHANNEL_PREFIX};
pub use publisher::{PubSubEvent, Publisher, PRESENCE_SYNC_EVENT};
pub use subscriber::{
    ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig, SubscriberError,
    SubscriberResult,
};
