//! Coordinator settings, derived from `AppConfig` or defaulted.

use std::time::Duration;
use tour_common::AppConfig;

/// Wait after connectivity returns before a sync pass starts
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(2000);

/// Typing stays asserted at most this long after the latest keystroke
pub const DEFAULT_AUTO_STOP: Duration = Duration::from_millis(3000);

/// Resolver calls running at once during a pass
pub const DEFAULT_MAX_CONCURRENT_RESOLVES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub settle_delay: Duration,
    /// Never below 1
    pub max_concurrent_resolves: usize,
    /// Per-document bound on the resolver; `None` waits indefinitely
    pub resolve_timeout: Option<Duration>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            max_concurrent_resolves: DEFAULT_MAX_CONCURRENT_RESOLVES,
            resolve_timeout: None,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_concurrent_resolves(mut self, limit: usize) -> Self {
        self.max_concurrent_resolves = limit.max(1);
        self
    }

    #[must_use]
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = Some(timeout);
        self
    }
}

impl From<&AppConfig> for SyncSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            settle_delay: config.offline.settle_delay(),
            max_concurrent_resolves: config.offline.max_concurrency.max(1),
            resolve_timeout: config.offline.resolve_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingSettings {
    pub auto_stop: Duration,
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            auto_stop: DEFAULT_AUTO_STOP,
        }
    }
}

impl From<&AppConfig> for TypingSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            auto_stop: config.typing.auto_stop(),
        }
    }
}
