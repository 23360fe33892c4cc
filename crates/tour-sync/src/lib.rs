//! # tour-sync
//!
//! Client-side coordination on top of the collaborator traits in `tour-core`:
//!
//! - [`SyncCoordinator`]: re-synchronizes the offline document cache, one pass
//!   at a time, never failing into the caller
//! - [`NetworkObserver`]: turns connectivity notifications into sync passes on
//!   the offline to online edge and exposes `is_online` / `is_syncing`
//! - [`TypingCoordinator`]: typing indicator for one conversation over a
//!   presence channel, with automatic expiry
//!
//! ## Example
//!
//! ```ignore
//! use tour_sync::{NetworkObserver, SyncCoordinator, SyncSettings, TypingCoordinator};
//!
//! let coordinator = Arc::new(SyncCoordinator::new(cache, resolver, SyncSettings::from(&config)));
//! let observer = NetworkObserver::new(coordinator, false);
//! observer.set_online(true); // sync pass after the settle delay
//!
//! let typing = TypingCoordinator::activate(hub, conversation_id, user_id, settings).await;
//! typing.start_typing("Ana").await;
//! ```

pub mod network;
pub mod settings;
pub mod sync;
pub mod typing;

#[cfg(test)]
pub(crate) mod test_support;

pub use network::{NetworkObserver, NetworkState};
pub use settings::{SyncSettings, TypingSettings};
pub use sync::SyncCoordinator;
pub use typing::{typing_topic, TypingCoordinator};
