//! Redis Pub/Sub publisher.

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::PubSubChannel;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

/// Event type announcing that a presence topic changed
pub const PRESENCE_SYNC_EVENT: &str = "PRESENCE_SYNC";

/// Event wrapper for Pub/Sub messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubSubEvent {
    /// Event type name (e.g., "PRESENCE_SYNC")
    pub event_type: String,
    /// Event payload
    pub data: serde_json::Value,
}

impl PubSubEvent {
    /// Create a new event
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Presence-sync notification; `presence_key` is the member that changed
    #[must_use]
    pub fn presence_sync(topic: &str, presence_key: &str) -> Self {
        Self::new(
            PRESENCE_SYNC_EVENT,
            serde_json::json!({ "topic": topic, "key": presence_key }),
        )
    }

    #[must_use]
    pub fn is_presence_sync(&self) -> bool {
        self.event_type == PRESENCE_SYNC_EVENT
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Redis Pub/Sub publisher
#[derive(Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    /// Create a new publisher
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an event to a channel
    pub async fn publish(&self, channel: &PubSubChannel, event: &PubSubEvent) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let channel_name = channel.name();
        let payload = event.to_json()?;

        let receivers: u32 = conn.publish(&channel_name, &payload).await?;

        tracing::debug!(
            channel = %channel_name,
            event_type = %event.event_type,
            receivers = receivers,
            "Published event"
        );

        Ok(receivers)
    }

    /// Announce that `presence_key` changed its record in `topic`
    pub async fn publish_presence_sync(&self, topic: &str, presence_key: &str) -> RedisResult<u32> {
        let event = PubSubEvent::presence_sync(topic, presence_key);
        self.publish(&PubSubChannel::presence(topic), &event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_sync_event() {
        let event = PubSubEvent::presence_sync("typing:c1", "u2");
        assert!(event.is_presence_sync());
        assert_eq!(event.data["topic"], "typing:c1");
        assert_eq!(event.data["key"], "u2");
    }

    #[test]
    fn test_event_serialization() {
        let event = PubSubEvent::new("TEST_EVENT", serde_json::json!({"content": "test"}));

        let json = event.to_json().unwrap();
        let parsed: PubSubEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
        assert!(!parsed.is_presence_sync());
    }
}
