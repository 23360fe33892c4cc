//! In-process presence hub.
//!
//! Every member of a topic shares one state map and one broadcast sender.
//! A topic is dropped from the hub once its last channel has left.
//! Used when no Redis is configured and throughout the tests.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tour_core::{
    PresenceChannel, PresenceError, PresenceRecord, PresenceResult, PresenceState,
    PresenceSubscription, PresenceTransport,
};

/// Buffered state notifications per topic
const TOPIC_BUFFER: usize = 64;

type Topics = DashMap<String, Arc<Topic>>;

struct Topic {
    state: RwLock<PresenceState>,
    sync_tx: broadcast::Sender<PresenceState>,
    /// Channels joined and not yet left
    channels: AtomicUsize,
}

impl Topic {
    fn new() -> Self {
        let (sync_tx, _) = broadcast::channel(TOPIC_BUFFER);
        Self {
            state: RwLock::new(PresenceState::new()),
            sync_tx,
            channels: AtomicUsize::new(0),
        }
    }

    /// Apply `change` and notify every subscriber with the resulting state
    fn update(&self, change: impl FnOnce(&mut PresenceState)) {
        let snapshot = {
            let mut state = self.state.write();
            change(&mut state);
            state.clone()
        };
        // No subscribers is fine
        let _ = self.sync_tx.send(snapshot);
    }
}

/// In-process presence transport
#[derive(Default, Clone)]
pub struct LocalPresenceHub {
    topics: Arc<Topics>,
}

impl LocalPresenceHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of members currently announced in `topic`
    #[must_use]
    pub fn member_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map_or(0, |t| t.state.read().len())
    }

    /// Number of topics with at least one joined channel
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Look up or create `name` and count one more channel on it
    fn attach(&self, name: &str) -> Arc<Topic> {
        // The entry guard keeps `detach` from removing the topic in between
        let topic = self
            .topics
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Topic::new()));
        topic.channels.fetch_add(1, Ordering::AcqRel);
        topic.clone()
    }
}

/// Count one channel off `name`, removing the topic once nobody is left
fn detach(topics: &Topics, name: &str) {
    topics.remove_if(name, |_, topic| {
        topic.channels.fetch_sub(1, Ordering::AcqRel) == 1 && topic.state.read().is_empty()
    });
}

#[async_trait]
impl PresenceTransport for LocalPresenceHub {
    async fn join(
        &self,
        topic: &str,
        presence_key: &str,
    ) -> PresenceResult<Arc<dyn PresenceChannel>> {
        if presence_key.is_empty() {
            return Err(PresenceError::Join {
                topic: topic.to_string(),
                reason: "empty presence key".to_string(),
            });
        }

        tracing::debug!(topic = %topic, presence_key = %presence_key, "Joined local presence topic");

        Ok(Arc::new(LocalPresenceChannel {
            name: topic.to_string(),
            key: presence_key.to_string(),
            topic: self.attach(topic),
            topics: self.topics.clone(),
            left: AtomicBool::new(false),
        }))
    }
}

struct LocalPresenceChannel {
    name: String,
    key: String,
    topic: Arc<Topic>,
    topics: Arc<Topics>,
    left: AtomicBool,
}

impl LocalPresenceChannel {
    /// Remove this member and release the topic; false if already left
    fn leave(&self) -> bool {
        if self.left.swap(true, Ordering::AcqRel) {
            return false;
        }
        let key = self.key.as_str();
        self.topic.update(|state| {
            state.remove(key);
        });
        detach(&self.topics, &self.name);
        true
    }
}

impl Drop for LocalPresenceChannel {
    fn drop(&mut self) {
        self.leave();
    }
}

#[async_trait]
impl PresenceChannel for LocalPresenceChannel {
    fn topic(&self) -> &str {
        &self.name
    }

    fn presence_key(&self) -> &str {
        &self.key
    }

    fn subscribe(&self) -> PresenceSubscription {
        PresenceSubscription::new(self.topic.sync_tx.subscribe())
    }

    async fn track(&self, record: PresenceRecord) -> PresenceResult<()> {
        if self.left.load(Ordering::Acquire) {
            return Err(PresenceError::Closed);
        }
        let key = self.key.clone();
        self.topic.update(|state| {
            state.insert(key, record);
        });
        Ok(())
    }

    async fn state(&self) -> PresenceResult<PresenceState> {
        Ok(self.topic.state.read().clone())
    }

    async fn unsubscribe(&self) -> PresenceResult<()> {
        if !self.leave() {
            return Ok(());
        }
        tracing::debug!(topic = %self.name, presence_key = %self.key, "Left local presence topic");
        Ok(())
    }
}
