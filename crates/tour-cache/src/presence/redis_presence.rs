//! Redis-backed presence transport.
//!
//! Channel state lives in the hash `presence:{topic}` (field = presence key,
//! value = JSON record). Every change publishes a `PRESENCE_SYNC` event on
//! the Pub/Sub channel of the topic; receivers answer it with a fresh
//! `HGETALL` snapshot.
//!
//! The hash TTL only expires a topic nobody tracks anymore. Individual
//! records whose `online_at` is older than the TTL belong to members that
//! went away without leaving; they are left out of snapshots and deleted.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tour_core::{
    PresenceChannel, PresenceError, PresenceRecord, PresenceResult, PresenceState,
    PresenceSubscription, PresenceTransport,
};

use crate::pool::{RedisPool, RedisPoolError, RedisResult};
use crate::pubsub::{PubSubChannel, Publisher, Subscriber, SubscriberConfig};

/// Key prefix for presence hashes
pub const PRESENCE_KEY_PREFIX: &str = "presence:";

/// Presence hash TTL in seconds, refreshed on every track
pub const PRESENCE_TTL: u64 = 300;

const SNAPSHOT_BUFFER: usize = 64;

fn presence_key(topic: &str) -> String {
    format!("{PRESENCE_KEY_PREFIX}{topic}")
}

fn transport_error(e: RedisPoolError) -> PresenceError {
    PresenceError::Transport(e.to_string())
}

/// Presence transport sharing state through Redis
#[derive(Clone)]
pub struct RedisPresenceTransport {
    pool: RedisPool,
    publisher: Publisher,
    subscriber: Arc<Subscriber>,
    ttl_seconds: u64,
}

impl RedisPresenceTransport {
    pub fn new(pool: RedisPool, subscriber: Arc<Subscriber>) -> Self {
        Self {
            publisher: Publisher::new(pool.clone()),
            pool,
            subscriber,
            ttl_seconds: PRESENCE_TTL,
        }
    }

    /// Build the pool and the Pub/Sub subscriber from configuration
    pub fn from_config(config: &tour_common::RedisConfig) -> RedisResult<Self> {
        let pool = RedisPool::from_config(config)?;
        let subscriber = Arc::new(Subscriber::new(SubscriberConfig::from(config)));
        Ok(Self::new(pool, subscriber))
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }
}

/// Split raw hash fields into the live state and the keys of stale records.
///
/// Records that are not JSON objects are skipped. Records without an
/// `online_at` are kept.
fn live_records(
    topic: &str,
    fields: HashMap<String, String>,
    now: DateTime<Utc>,
    max_age_seconds: u64,
) -> (PresenceState, Vec<String>) {
    let cutoff = i64::try_from(max_age_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|age| now.checked_sub_signed(age));
    let mut state = PresenceState::with_capacity(fields.len());
    let mut stale = Vec::new();
    for (key, raw) in fields {
        match serde_json::from_str::<PresenceRecord>(&raw) {
            Ok(record) if record.online_at().zip(cutoff).is_some_and(|(at, cut)| at < cut) => {
                stale.push(key);
            }
            Ok(record) => {
                state.insert(key, record);
            }
            Err(e) => {
                tracing::warn!(topic = %topic, presence_key = %key, error = %e, "Skipping malformed presence record");
            }
        }
    }
    (state, stale)
}

/// Read the live presence state of `topic`, pruning stale records
async fn load_state(
    pool: &RedisPool,
    topic: &str,
    max_age_seconds: u64,
) -> RedisResult<PresenceState> {
    let hash = presence_key(topic);
    let fields = pool.hash_get_all(&hash).await?;
    let (state, stale) = live_records(topic, fields, Utc::now(), max_age_seconds);
    for key in stale {
        tracing::debug!(topic = %topic, presence_key = %key, "Pruning stale presence record");
        if let Err(e) = pool.hash_delete(&hash, &key).await {
            tracing::warn!(topic = %topic, presence_key = %key, error = %e, "Failed to prune presence record");
        }
    }
    Ok(state)
}

#[async_trait]
impl PresenceTransport for RedisPresenceTransport {
    async fn join(
        &self,
        topic: &str,
        presence_key: &str,
    ) -> PresenceResult<Arc<dyn PresenceChannel>> {
        let join_error = |reason: String| PresenceError::Join {
            topic: topic.to_string(),
            reason,
        };

        if presence_key.is_empty() {
            return Err(join_error("empty presence key".to_string()));
        }

        // Listen before subscribing so no notification is lost in between
        let mut messages = self.subscriber.receiver();
        self.subscriber
            .subscribe(&[PubSubChannel::presence(topic)])
            .await
            .map_err(|e| join_error(e.to_string()))?;

        let (sync_tx, _) = broadcast::channel(SNAPSHOT_BUFFER);
        let forward = {
            let pool = self.pool.clone();
            let topic = topic.to_string();
            let sync_tx = sync_tx.clone();
            let ttl_seconds = self.ttl_seconds;
            tokio::spawn(async move {
                loop {
                    let message = match messages.recv().await {
                        Ok(message) => message,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(topic = %topic, skipped, "Presence notifications lagged");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    };
                    if message.presence_topic() != Some(topic.as_str()) {
                        continue;
                    }
                    match load_state(&pool, &topic, ttl_seconds).await {
                        Ok(state) => {
                            let _ = sync_tx.send(state);
                        }
                        Err(e) => {
                            tracing::warn!(topic = %topic, error = %e, "Failed to load presence snapshot");
                        }
                    }
                }
            })
        };

        tracing::debug!(topic = %topic, presence_key = %presence_key, "Joined Redis presence topic");

        Ok(Arc::new(RedisPresenceChannel {
            topic: topic.to_string(),
            key: presence_key.to_string(),
            pool: self.pool.clone(),
            publisher: self.publisher.clone(),
            ttl_seconds: self.ttl_seconds,
            sync_tx,
            forward: Mutex::new(Some(forward)),
            left: AtomicBool::new(false),
        }))
    }
}

struct RedisPresenceChannel {
    topic: String,
    key: String,
    pool: RedisPool,
    publisher: Publisher,
    ttl_seconds: u64,
    sync_tx: broadcast::Sender<PresenceState>,
    forward: Mutex<Option<JoinHandle<()>>>,
    left: AtomicBool,
}

impl RedisPresenceChannel {
    async fn notify(&self) -> RedisResult<()> {
        self.publisher
            .publish_presence_sync(&self.topic, &self.key)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PresenceChannel for RedisPresenceChannel {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn presence_key(&self) -> &str {
        &self.key
    }

    fn subscribe(&self) -> PresenceSubscription {
        PresenceSubscription::new(self.sync_tx.subscribe())
    }

    async fn track(&self, record: PresenceRecord) -> PresenceResult<()> {
        if self.left.load(Ordering::Acquire) {
            return Err(PresenceError::Closed);
        }
        let payload =
            serde_json::to_string(&record).map_err(|e| PresenceError::Track(e.to_string()))?;

        self.pool
            .hash_set(&presence_key(&self.topic), &self.key, &payload, self.ttl_seconds)
            .await
            .map_err(|e| PresenceError::Track(e.to_string()))?;
        self.notify().await.map_err(transport_error)
    }

    async fn state(&self) -> PresenceResult<PresenceState> {
        load_state(&self.pool, &self.topic, self.ttl_seconds)
            .await
            .map_err(transport_error)
    }

    async fn unsubscribe(&self) -> PresenceResult<()> {
        if self.left.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(handle) = self.forward.lock().take() {
            handle.abort();
        }

        self.pool
            .hash_delete(&presence_key(&self.topic), &self.key)
            .await
            .map_err(transport_error)?;
        self.notify().await.map_err(transport_error)?;

        tracing::debug!(topic = %self.topic, presence_key = %self.key, "Left Redis presence topic");
        Ok(())
    }
}

impl Drop for RedisPresenceChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.forward.get_mut().take() {
            handle.abort();
        }
    }
}
