//! Minimum-interval guard against point farming.

use crate::{FarmingConfig, UserId};
use guildhall_core::{Clock, SharedClock, Sweep, SweeperSlot, SystemClock, ceil_secs};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Outcome of a farming check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FarmingDecision {
    /// Points may be credited. The action time has been recorded.
    Allowed,
    /// Too soon since the last credited action.
    Denied {
        /// Whole seconds until the next action is allowed, rounded up
        retry_after_secs: u64,
        /// Human-readable explanation
        reason: String,
    },
}

impl FarmingDecision {
    /// Whether points may be credited.
    pub fn is_allowed(&self) -> bool {
        matches!(self, FarmingDecision::Allowed)
    }

    /// Seconds to surface to the user on denial.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            FarmingDecision::Allowed => None,
            FarmingDecision::Denied {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
        }
    }
}

/// Farming guard metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FarmingStats {
    /// Users with a recorded last action
    pub tracked_users: usize,
}

struct FarmingState {
    last_actions: Mutex<HashMap<UserId, Instant>>,
    min_interval: Duration,
    clock: SharedClock,
}

impl FarmingState {
    fn evict_stale(&self) -> usize {
        let now = self.clock.now();
        let mut last_actions = self.last_actions.lock();
        let before = last_actions.len();

        // A record older than the interval would allow the next action anyway.
        last_actions.retain(|_, last| now.saturating_duration_since(*last) < self.min_interval);

        let removed = before - last_actions.len();
        if removed > 0 {
            info!(
                removed,
                remaining = last_actions.len(),
                "Swept stale farming records"
            );
        }
        removed
    }
}

impl Sweep for FarmingState {
    fn name(&self) -> &'static str {
        "farming_guard"
    }

    fn sweep(&self) -> usize {
        self.evict_stale()
    }
}

/// Single-slot debounce on point-earning actions.
///
/// Unlike [`AntiSpamManager`](crate::AntiSpamManager) there is no window: only
/// the last allowed action matters.
///
/// # Example
///
/// ```
/// use guildhall_rate_limit::{FarmingConfig, FarmingGuard};
///
/// let guard = FarmingGuard::new(FarmingConfig::default());
/// assert!(guard.can_proceed(42).is_allowed());
/// assert!(!guard.can_proceed(42).is_allowed());
/// ```
pub struct FarmingGuard {
    config: FarmingConfig,
    state: Arc<FarmingState>,
    sweeper: SweeperSlot,
}

impl FarmingGuard {
    /// Create a guard reading time from the system clock.
    pub fn new(config: FarmingConfig) -> Self {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Create a guard reading time from `clock`.
    pub fn with_clock(config: FarmingConfig, clock: SharedClock) -> Self {
        debug!(
            min_interval_ms = config.min_interval_ms(),
            "Creating new FarmingGuard"
        );
        Self {
            state: Arc::new(FarmingState {
                last_actions: Mutex::new(HashMap::new()),
                min_interval: config.min_interval(),
                clock,
            }),
            config,
            sweeper: SweeperSlot::new(),
        }
    }

    /// The configuration this guard was built with.
    pub fn config(&self) -> &FarmingConfig {
        &self.config
    }

    /// Check whether `user_id` may earn points now, recording the action if so.
    #[instrument(skip(self))]
    pub fn can_proceed(&self, user_id: UserId) -> FarmingDecision {
        let now = self.state.clock.now();
        let min_interval = self.state.min_interval;
        let mut last_actions = self.state.last_actions.lock();

        if let Some(last) = last_actions.get(&user_id) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < min_interval {
                let retry_after_secs = ceil_secs(min_interval - elapsed);
                debug!(retry_after_secs, "Farming interval not elapsed");
                return FarmingDecision::Denied {
                    retry_after_secs,
                    reason: format!(
                        "Please wait {} more seconds before earning points again",
                        retry_after_secs
                    ),
                };
            }
        }

        last_actions.insert(user_id, now);
        debug!("Farming check passed");
        FarmingDecision::Allowed
    }

    /// Forget the user's last action so the next check is allowed.
    pub fn reset(&self, user_id: UserId) -> bool {
        let existed = self.state.last_actions.lock().remove(&user_id).is_some();
        info!(user_id, existed, "Reset farming guard");
        existed
    }

    /// Remove records older than the interval now. Returns the number removed.
    pub fn sweep_stale(&self) -> usize {
        self.state.evict_stale()
    }

    /// Snapshot of tracked users.
    pub fn stats(&self) -> FarmingStats {
        FarmingStats {
            tracked_users: self.state.last_actions.lock().len(),
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

impl Default for FarmingGuard {
    fn default() -> Self {
        Self::new(FarmingConfig::default())
    }
}
