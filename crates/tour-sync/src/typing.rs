//! Typing indicator over a presence channel.
//!
//! Each participant announces a presence record in the conversation's topic.
//! `start_typing` asserts `typing=true` and arms an auto-stop timer; every
//! call re-arms it, so the flag never outlives the latest keystroke by more
//! than `TypingSettings::auto_stop`. Incoming presence syncs are projected
//! onto the set of remote participants that are typing; the projection is
//! only republished when that set actually changes.
//!
//! Presence faults are logged and swallowed. A coordinator whose channel
//! could not be joined behaves like one nobody else can hear.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tour_core::{
    ConversationId, PresenceChannel, PresenceRecord, PresenceState, PresenceTransport, TypingUser,
    UserId,
};

use crate::settings::TypingSettings;

/// Presence topic of a conversation's typing indicator
#[must_use]
pub fn typing_topic(conversation: &ConversationId) -> String {
    format!("typing:{conversation}")
}

pub struct TypingCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    conversation: ConversationId,
    user: UserId,
    settings: TypingSettings,
    /// `None` when joining failed
    channel: Option<Arc<dyn PresenceChannel>>,
    typing_tx: watch::Sender<Vec<TypingUser>>,
    /// Last published set, for change detection
    last_typing: Mutex<HashSet<TypingUser>>,
    auto_stop: Mutex<Option<JoinHandle<()>>>,
    /// Bumped by every start/stop; a timer from an older generation is stale
    generation: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
    torn_down: AtomicBool,
}

impl TypingCoordinator {
    /// Join the conversation's presence topic and announce `typing=false`
    #[tracing::instrument(skip_all, fields(conversation_id = %conversation, user_id = %user))]
    pub async fn activate(
        transport: Arc<dyn PresenceTransport>,
        conversation: ConversationId,
        user: UserId,
        settings: TypingSettings,
    ) -> Self {
        let topic = typing_topic(&conversation);
        let channel = match transport.join(&topic, user.as_str()).await {
            Ok(channel) => Some(channel),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to join typing channel, typing state will not be broadcast");
                None
            }
        };

        let (typing_tx, _) = watch::channel(Vec::new());
        let inner = Arc::new(Inner {
            conversation,
            user,
            settings,
            channel,
            typing_tx,
            last_typing: Mutex::new(HashSet::new()),
            auto_stop: Mutex::new(None),
            generation: AtomicU64::new(0),
            listener: Mutex::new(None),
            torn_down: AtomicBool::new(false),
        });

        if let Some(channel) = inner.channel.clone() {
            let mut subscription = channel.subscribe();
            let weak = Arc::downgrade(&inner);
            let listener = tokio::spawn(async move {
                while let Some(state) = subscription.next().await {
                    let Some(inner) = weak.upgrade() else { break };
                    inner.apply(&state);
                }
            });
            *inner.listener.lock() = Some(listener);

            // Members already present before we subscribed
            match channel.state().await {
                Ok(state) => inner.apply(&state),
                Err(e) => tracing::warn!(error = %e, "Failed to read typing channel state"),
            }

            inner.announce(PresenceRecord::idle(&inner.user)).await;
        }

        Self { inner }
    }

    /// Announce `typing=true` and (re)arm the auto-stop timer
    pub async fn start_typing(&self, display_name: &str) {
        let inner = &self.inner;
        if inner.is_torn_down() {
            return;
        }

        let generation = inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        inner.cancel_auto_stop();
        inner
            .announce(PresenceRecord::typing(&inner.user, display_name, Utc::now()))
            .await;

        if inner.is_torn_down() || inner.generation.load(Ordering::Acquire) != generation {
            // Stopped or restarted while announcing
            return;
        }

        let weak: Weak<Inner> = Arc::downgrade(inner);
        let delay = inner.settings.auto_stop;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.auto_stop_fired(generation).await;
            }
        });
        if let Some(previous) = inner.auto_stop.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Cancel the auto-stop timer and announce `typing=false`
    pub async fn stop_typing(&self) {
        let inner = &self.inner;
        if inner.is_torn_down() {
            return;
        }
        inner.generation.fetch_add(1, Ordering::AcqRel);
        inner.cancel_auto_stop();
        inner.announce(PresenceRecord::idle(&inner.user)).await;
    }

    /// Leave the channel. Later calls to `start_typing`/`stop_typing` do nothing.
    pub async fn leave(&self) {
        let inner = &self.inner;
        if inner.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        inner.generation.fetch_add(1, Ordering::AcqRel);
        inner.cancel_auto_stop();
        inner.stop_listener();

        if let Some(channel) = &inner.channel {
            if let Err(e) = channel.unsubscribe().await {
                tracing::warn!(
                    conversation_id = %inner.conversation,
                    error = %e,
                    "Failed to leave typing channel"
                );
            }
        }

        inner.last_typing.lock().clear();
        inner.typing_tx.send_replace(Vec::new());
        tracing::debug!(conversation_id = %inner.conversation, "Left typing channel");
    }

    /// Remote participants currently typing, sorted by user id
    #[must_use]
    pub fn typing_users(&self) -> Vec<TypingUser> {
        self.inner.typing_tx.borrow().clone()
    }

    /// Observe the typing projection
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<TypingUser>> {
        self.inner.typing_tx.subscribe()
    }

    /// Whether typing state is being broadcast
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.channel.is_some() && !self.inner.is_torn_down()
    }

    #[must_use]
    pub fn conversation(&self) -> &ConversationId {
        &self.inner.conversation
    }

    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.inner.user
    }
}

impl Drop for TypingCoordinator {
    fn drop(&mut self) {
        let inner = &self.inner;
        if inner.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        inner.cancel_auto_stop();
        inner.stop_listener();

        // Release the channel if there is still a runtime to do it on
        if let (Some(channel), Ok(runtime)) = (
            inner.channel.clone(),
            tokio::runtime::Handle::try_current(),
        ) {
            runtime.spawn(async move {
                let _ = channel.unsubscribe().await;
            });
        }
    }
}

impl Inner {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    fn cancel_auto_stop(&self) {
        if let Some(timer) = self.auto_stop.lock().take() {
            timer.abort();
        }
    }

    fn stop_listener(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
    }

    /// Called from the timer task itself, so the handle is dropped, not aborted
    async fn auto_stop_fired(&self, generation: u64) {
        if self.is_torn_down() || self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        drop(self.auto_stop.lock().take());
        tracing::debug!(conversation_id = %self.conversation, "Typing auto-stopped after inactivity");
        self.announce(PresenceRecord::idle(&self.user)).await;
    }

    async fn announce(&self, record: PresenceRecord) {
        if self.is_torn_down() {
            return;
        }
        let Some(channel) = &self.channel else {
            tracing::trace!(conversation_id = %self.conversation, "Typing channel unavailable, not broadcasting");
            return;
        };
        if let Err(e) = channel.track(record).await {
            tracing::warn!(
                conversation_id = %self.conversation,
                error = %e,
                "Failed to broadcast typing state"
            );
        }
    }

    /// Recompute the projection from a full channel state
    fn apply(&self, state: &PresenceState) {
        let current = TypingUser::collect(state, &self.user);

        let mut last = self.last_typing.lock();
        if *last == current {
            return;
        }

        let mut users: Vec<TypingUser> = current.iter().cloned().collect();
        users.sort();
        *last = current;
        drop(last);

        tracing::trace!(conversation_id = %self.conversation, typing = users.len(), "Typing users changed");
        self.typing_tx.send_replace(users);
    }
}
