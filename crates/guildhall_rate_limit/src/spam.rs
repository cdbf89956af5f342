//! Sliding-window message spam detection.

use crate::{SpamConfig, UserId};
use guildhall_core::{Clock, SharedClock, Sweep, SweeperSlot, SystemClock};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Outcome of a spam check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpamVerdict {
    /// The message was admitted and counts toward the window.
    Clean,
    /// The message is part of a burst and was not counted.
    Spamming {
        /// Human-readable explanation
        reason: String,
        /// Suggested mute length
        mute_duration: Duration,
    },
}

impl SpamVerdict {
    /// Whether the message should be suppressed.
    pub fn is_spamming(&self) -> bool {
        matches!(self, SpamVerdict::Spamming { .. })
    }
}

/// Spam detector metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpamStats {
    /// Users with a message window
    pub tracked_users: usize,
}

struct SpamState {
    windows: Mutex<HashMap<UserId, VecDeque<Instant>>>,
    window: Duration,
    clock: SharedClock,
}

/// Drop timestamps older than `window`. Timestamps are appended in clock order,
/// so the oldest are at the front.
fn trim(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = timestamps.front() {
        if now.saturating_duration_since(oldest) > window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

impl SpamState {
    fn evict_idle(&self) -> usize {
        let now = self.clock.now();
        let mut windows = self.windows.lock();
        let before = windows.len();

        windows.retain(|_, timestamps| {
            trim(timestamps, now, self.window);
            !timestamps.is_empty()
        });

        let removed = before - windows.len();
        if removed > 0 {
            info!(removed, remaining = windows.len(), "Swept idle spam windows");
        }
        removed
    }
}

impl Sweep for SpamState {
    fn name(&self) -> &'static str {
        "spam_windows"
    }

    fn sweep(&self) -> usize {
        self.evict_idle()
    }
}

/// Flags users who send too many messages in a short window.
///
/// The current message counts toward the threshold. Flagged messages are not
/// recorded, so a user who keeps spamming cannot stretch their own window;
/// they are admitted again once their earlier messages age out.
pub struct AntiSpamManager {
    config: SpamConfig,
    state: Arc<SpamState>,
    sweeper: SweeperSlot,
}

impl AntiSpamManager {
    /// Create a detector reading time from the system clock.
    pub fn new(config: SpamConfig) -> Self {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Create a detector reading time from `clock`.
    pub fn with_clock(config: SpamConfig, clock: SharedClock) -> Self {
        debug!(
            message_threshold = config.message_threshold(),
            time_window_ms = config.time_window_ms(),
            "Creating new AntiSpamManager"
        );
        Self {
            state: Arc::new(SpamState {
                windows: Mutex::new(HashMap::new()),
                window: config.time_window(),
                clock,
            }),
            config,
            sweeper: SweeperSlot::new(),
        }
    }

    /// The configuration this detector was built with.
    pub fn config(&self) -> &SpamConfig {
        &self.config
    }

    /// Check a message from `user_id`, recording it if admitted.
    #[instrument(skip(self))]
    pub fn check_spam(&self, user_id: UserId) -> SpamVerdict {
        let now = self.state.clock.now();
        let mut windows = self.state.windows.lock();
        let timestamps = windows.entry(user_id).or_default();

        trim(timestamps, now, self.state.window);

        let count = timestamps.len() + 1;
        if count >= *self.config.message_threshold() {
            let mute_duration = self.config.mute_duration();
            debug!(
                count,
                mute_ms = mute_duration.as_millis() as u64,
                "Spam detected"
            );
            return SpamVerdict::Spamming {
                reason: format!(
                    "Sent {} messages within {} seconds",
                    count,
                    self.state.window.as_secs_f64()
                ),
                mute_duration,
            };
        }

        timestamps.push_back(now);
        debug!(count, "Message admitted");
        SpamVerdict::Clean
    }

    /// Forget every recorded message for `user_id`, e.g. when a mute is lifted.
    ///
    /// Returns whether anything was recorded.
    #[instrument(skip(self))]
    pub fn clear_history(&self, user_id: UserId) -> bool {
        let cleared = self.state.windows.lock().remove(&user_id).is_some();
        debug!(cleared, "Cleared spam history");
        cleared
    }

    /// Number of admitted messages currently inside the user's window.
    pub fn recent_messages(&self, user_id: UserId) -> usize {
        let now = self.state.clock.now();
        self.state
            .windows
            .lock()
            .get(&user_id)
            .map(|timestamps| {
                timestamps
                    .iter()
                    .filter(|ts| now.saturating_duration_since(**ts) <= self.state.window)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Remove windows with no recent messages now. Returns the number of users dropped.
    pub fn sweep_idle(&self) -> usize {
        self.state.evict_idle()
    }

    /// Snapshot of tracked users.
    pub fn stats(&self) -> SpamStats {
        SpamStats {
            tracked_users: self.state.windows.lock().len(),
        }
    }

    /// Start the background sweep on the configured interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self) {
        self.sweeper
            .start(Arc::downgrade(&self.state), self.config.sweep_interval());
    }

    /// Stop the background sweep.
    pub fn close(&self) {
        self.sweeper.stop();
    }

    /// Whether a background sweep is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }
}

impl Default for AntiSpamManager {
    fn default() -> Self {
        Self::new(SpamConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildhall_core::ManualClock;

    #[test]
    fn test_trim_keeps_boundary_timestamp() {
        let clock = ManualClock::new();
        let start = clock.now();
        let mut timestamps = VecDeque::from([start]);

        clock.advance_ms(5_000);
        trim(&mut timestamps, clock.now(), Duration::from_millis(5_000));
        assert_eq!(timestamps.len(), 1);

        clock.advance_ms(1);
        trim(&mut timestamps, clock.now(), Duration::from_millis(5_000));
        assert!(timestamps.is_empty());
    }

    #[test]
    fn test_flagged_message_is_not_recorded() {
        let clock = ManualClock::new();
        let spam = AntiSpamManager::with_clock(
            SpamConfig::default().with_message_threshold(3),
            clock.shared(),
        );

        assert!(!spam.check_spam(7).is_spamming());
        assert!(!spam.check_spam(7).is_spamming());
        assert!(spam.check_spam(7).is_spamming());
        assert!(spam.check_spam(7).is_spamming());
        assert_eq!(spam.recent_messages(7), 2);
    }
}
