//! Per-user, per-command cooldowns with escalation.
//!
//! A user who keeps retrying a command while it is cooling down is not only
//! denied; every denied attempt adds `escalation_step` to the *next* cooldown.
//! The violation count resets once that next cooldown starts, so the penalty
//! applies to one window at a time.

use crate::{CooldownConfig, UserId};
use derive_getters::Getters;
use guildhall_core::{Clock, SharedClock, Sweep, SweeperSlot, SystemClock, ceil_secs};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Longest cooldown a record will hold. Longer requests, including saturated
/// escalations, are clamped so the expiry instant stays representable.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Cooldown state for one (user, command) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct CooldownRecord {
    expires_at: Instant,
    violation_count: u32,
}

impl CooldownRecord {
    /// `cooldown` must already be clamped to [`MAX_COOLDOWN`].
    fn starting(now: Instant, cooldown: Duration) -> Self {
        Self {
            expires_at: now.checked_add(cooldown).unwrap_or(now),
            violation_count: 0,
        }
    }
}

/// Outcome of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// The command may run. A new cooldown of `cooldown` has started.
    Allowed {
        /// Length of the cooldown that just started, including escalation
        cooldown: Duration,
    },
    /// The command is cooling down.
    Denied {
        /// Whole seconds until the cooldown ends, rounded up
        retry_after_secs: u64,
        /// Denied attempts during the current cooldown, this one included
        violation_count: u32,
    },
}

impl CooldownDecision {
    /// Whether the command may run.
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownDecision::Allowed { .. })
    }

    /// Seconds to surface to the user on denial.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            CooldownDecision::Allowed { .. } => None,
            CooldownDecision::Denied {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
        }
    }
}

/// Cooldown manager metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CooldownStats {
    /// Users with an entry in the map
    pub total_users: usize,
    /// Users with at least one cooldown record
    pub active_users: usize,
    /// Cooldown records across all users
    pub total_records: usize,
}

type CommandRecords = HashMap<String, CooldownRecord>;

struct CooldownState {
    users: Mutex<HashMap<UserId, CommandRecords>>,
    clock: SharedClock,
}

impl CooldownState {
    fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut users = self.users.lock();
        let mut removed = 0;

        for commands in users.values_mut() {
            let before = commands.len();
            commands.retain(|_, record| now < record.expires_at);
            removed += before - commands.len();
        }

        let users_before = users.len();
        users.retain(|_, commands| !commands.is_empty());

        if removed > 0 {
            info!(
                removed,
                users_dropped = users_before - users.len(),
                remaining_users = users.len(),
                "Swept expired cooldowns"
            );
        }
        removed
    }
}

impl Sweep for CooldownState {
    fn name(&self) -> &'static str {
        "command_cooldowns"
    }

    fn sweep(&self) -> usize {
        self.evict_expired()
    }
}

/// Tracks cooldowns for every (user, command) pair.
///
/// # Example
///
/// ```
/// use guildhall_rate_limit::{CommandCooldownManager, CooldownConfig};
/// use std::time::Duration;
///
/// let cooldowns = CommandCooldownManager::new(CooldownConfig::default());
/// let five_secs = Duration::from_secs(5);
///
/// assert!(cooldowns.check(42, "trivia", five_secs).is_allowed());
///
/// let retry = cooldowns.check(42, "trivia", five_secs);
/// assert!(!retry.is_allowed());
/// assert_eq!(retry.retry_after_secs(), Some(5));
/// ```
pub struct CommandCooldownManager {
    config: CooldownConfig,
    state: Arc<CooldownState>,
    sweeper: SweeperSlot,
}

impl CommandCooldownManager {
    /// Create a manager reading time from the system clock.
    pub fn new(config: CooldownConfig) -> Self {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Create a manager reading time from `clock`.
    pub fn with_clock(config: CooldownConfig, clock: SharedClock) -> Self {
        debug!(
            default_cooldown_ms = config.default_cooldown_ms(),
            escalation_step_ms = config.escalation_step_ms(),
            commands = config.commands().len(),
            "Creating new CommandCooldownManager"
        );
        Self {
            config,
            state: Arc::new(CooldownState {
                users: Mutex::new(HashMap::new()),
                clock,
            }),
            sweeper: SweeperSlot::new(),
        }
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &CooldownConfig {
        &self.config
    }

    /// Check and record an invocation of `command` by `user_id`.
    ///
    /// - First use: allowed, cooldown of `base_cooldown` starts.
    /// - During a cooldown: denied, the record's violation count goes up.
    /// - After a cooldown: allowed, the new cooldown is `base_cooldown` plus one
    ///   escalation step per violation in the previous window.
    ///
    /// Cooldowns longer than [`MAX_COOLDOWN`] are clamped to it.
    #[instrument(skip(self))]
    pub fn check(
        &self,
        user_id: UserId,
        command: &str,
        base_cooldown: Duration,
    ) -> CooldownDecision {
        let base_cooldown = base_cooldown.min(MAX_COOLDOWN);
        let now = self.state.clock.now();
        let mut users = self.state.users.lock();
        let commands = users.entry(user_id).or_default();

        match commands.get_mut(command) {
            Some(record) if now < record.expires_at => {
                record.violation_count += 1;
                let retry_after_secs = ceil_secs(record.expires_at - now);
                debug!(
                    retry_after_secs,
                    violation_count = record.violation_count,
                    "Command on cooldown"
                );
                CooldownDecision::Denied {
                    retry_after_secs,
                    violation_count: record.violation_count,
                }
            }
            Some(record) => {
                let penalty = self
                    .config
                    .escalation_step()
                    .saturating_mul(record.violation_count);
                let cooldown = base_cooldown.saturating_add(penalty).min(MAX_COOLDOWN);
                debug!(
                    prior_violations = record.violation_count,
                    cooldown_ms = cooldown.as_millis() as u64,
                    "Cooldown elapsed, starting escalated cooldown"
                );
                *record = CooldownRecord::starting(now, cooldown);
                CooldownDecision::Allowed { cooldown }
            }
            None => {
                commands.insert(
                    command.to_string(),
                    CooldownRecord::starting(now, base_cooldown),
                );
                debug!(
                    cooldown_ms = base_cooldown.as_millis() as u64,
                    "First use, starting cooldown"
                );
                CooldownDecision::Allowed {
                    cooldown: base_cooldown,
                }
            }
        }
    }

    /// [`check`](Self::check) with the configured cooldown for `command`.
    pub fn check_command(&self, user_id: UserId, command: &str) -> CooldownDecision {
        self.check(user_id, command, self.config.cooldown_for(command))
    }

    /// Time left on a cooldown without recording an attempt.
    pub fn remaining(&self, user_id: UserId, command: &str) -> Option<Duration> {
        let now = self.state.clock.now();
        let users = self.state.users.lock();
        let record = users.get(&user_id)?.get(command)?;
        record.expires_at.checked_duration_since(now).filter(|d| !d.is_zero())
    }

    /// Current record for a pair, if any.
    pub fn record(&self, user_id: UserId, command: &str) -> Option<CooldownRecord> {
        self.state
            .users
            .lock()
            .get(&user_id)
            .and_then(|commands| commands.get(command))
            .copied()
    }

    /// Drop the cooldown for a pair so the next check is allowed.
    ///
    /// Returns whether a record existed.
    #[instrument(skip(self))]
    pub fn reset(&self, user_id: UserId, command: &str) -> bool {
        let mut users = self.state.users.lock();
        let Some(commands) = users.get_mut(&user_id) else {
            return false;
        };

        let existed = commands.remove(command).is_some();
        if commands.is_empty() {
            users.remove(&user_id);
        }
        info!(existed, "Reset cooldown");
        existed
    }

    /// Evict expired cooldowns now. Returns the number of records removed.
    pub fn sweep_expired(&self) -> usize {
        self.state.evict_expired()
    }

    /// Snapshot of tracked users and records.
    pub fn stats(&self) -> CooldownStats {
        let users = self.state.users.lock();
        CooldownStats {
            total_users: users.len(),
            active_users: users.values().filter(|c| !c.is_empty()).count(),
            total_records: users.values().map(HashMap::len).sum(),
        }
    }

    /// Start the background sweep on the configured interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self) {
        self.sweeper
            .start(Arc::downgrade(&self.state), self.config.sweep_interval());
    }

    /// Stop the background sweep. Records are kept.
    pub fn close(&self) {
        self.sweeper.stop();
    }

    /// Whether a background sweep is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }
}

impl Default for CommandCooldownManager {
    fn default() -> Self {
        Self::new(CooldownConfig::default())
    }
}
