//! Pub/Sub channel definitions.

/// Channel prefix for presence-sync notifications of one topic
pub const PRESENCE_CHANNEL_PREFIX: &str = "presence:";

/// Pub/Sub channel types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    /// Presence-sync notifications for one presence topic
    Presence(String),
    /// Custom channel name
    Custom(String),
}

impl PubSubChannel {
    /// Create the presence channel of `topic`
    #[must_use]
    pub fn presence(topic: impl Into<String>) -> Self {
        Self::Presence(topic.into())
    }

    /// Create a custom channel
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the Redis channel name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Presence(topic) => format!("{PRESENCE_CHANNEL_PREFIX}{topic}"),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a channel name back to a `PubSubChannel`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.strip_prefix(PRESENCE_CHANNEL_PREFIX) {
            Some(topic) if !topic.is_empty() => Self::Presence(topic.to_string()),
            _ => Self::Custom(name.to_string()),
        }
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
