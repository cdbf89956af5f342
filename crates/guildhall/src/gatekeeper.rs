//! One owner for every cache and guard, routing inbound bot events.

use crate::GuildhallConfig;
use guildhall_cache::{CacheStats, NamedCache, TtlCache};
use guildhall_core::{Clock, SharedClock, SystemClock};
use guildhall_error::GuildhallResult;
use guildhall_rate_limit::{
    AntiSpamManager, CommandCooldownManager, CooldownDecision, CooldownStats, FarmingDecision,
    FarmingGuard, FarmingStats, SpamStats, SpamVerdict, UserId,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Outcome counters for routed events.
#[derive(Debug, Default)]
struct EventCounters {
    commands_allowed: AtomicU64,
    commands_denied: AtomicU64,
    messages_clean: AtomicU64,
    messages_flagged: AtomicU64,
    points_allowed: AtomicU64,
    points_denied: AtomicU64,
}

impl EventCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> EventStats {
        EventStats {
            commands_allowed: self.commands_allowed.load(Ordering::Relaxed),
            commands_denied: self.commands_denied.load(Ordering::Relaxed),
            messages_clean: self.messages_clean.load(Ordering::Relaxed),
            messages_flagged: self.messages_flagged.load(Ordering::Relaxed),
            points_allowed: self.points_allowed.load(Ordering::Relaxed),
            points_denied: self.points_denied.load(Ordering::Relaxed),
        }
    }
}

/// Counts of routed events by outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventStats {
    /// Commands allowed to run
    pub commands_allowed: u64,
    /// Commands denied by a cooldown
    pub commands_denied: u64,
    /// Messages admitted
    pub messages_clean: u64,
    /// Messages flagged as spam
    pub messages_flagged: u64,
    /// Point awards allowed
    pub points_allowed: u64,
    /// Point awards denied as farming
    pub points_denied: u64,
}

/// Snapshot of every component, as served by `/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct GatekeeperStats {
    /// Seconds since the gatekeeper was created
    pub uptime_secs: u64,
    /// Whether the background sweeps are running
    pub sweeping: bool,
    /// Cache metrics
    pub cache: CacheStats,
    /// Cooldown metrics
    pub cooldowns: CooldownStats,
    /// Spam detector metrics
    pub spam: SpamStats,
    /// Farming guard metrics
    pub farming: FarmingStats,
    /// Routed event outcomes
    pub events: EventStats,
}

/// Owns the cache and the three guards, all reading the same clock.
///
/// # Example
///
/// ```
/// use guildhall::{Gatekeeper, GuildhallConfig};
///
/// let gatekeeper = Gatekeeper::new(GuildhallConfig::default()).unwrap();
/// assert!(gatekeeper.on_command(42, "trivia").is_allowed());
/// assert!(!gatekeeper.on_command(42, "trivia").is_allowed());
/// ```
pub struct Gatekeeper {
    config: GuildhallConfig,
    cache: TtlCache,
    cooldowns: CommandCooldownManager,
    spam: AntiSpamManager,
    farming: FarmingGuard,
    counters: EventCounters,
    clock: SharedClock,
    created_at: Instant,
}

impl Gatekeeper {
    /// Build every component from `config` on the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn new(config: GuildhallConfig) -> GuildhallResult<Self> {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Build every component from `config` reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn with_clock(config: GuildhallConfig, clock: SharedClock) -> GuildhallResult<Self> {
        config.validate()?;

        Ok(Self {
            cache: TtlCache::with_clock(config.cache.clone(), clock.clone()),
            cooldowns: CommandCooldownManager::with_clock(config.cooldown.clone(), clock.clone()),
            spam: AntiSpamManager::with_clock(config.spam.clone(), clock.clone()),
            farming: FarmingGuard::with_clock(config.farming.clone(), clock.clone()),
            counters: EventCounters::default(),
            created_at: clock.now(),
            clock,
            config,
        })
    }

    /// The configuration the components were built with.
    pub fn config(&self) -> &GuildhallConfig {
        &self.config
    }

    /// Start every background sweep.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        self.cache.start_sweeper();
        self.cooldowns.start_sweeper();
        self.spam.start_sweeper();
        self.farming.start_sweeper();
        info!("Started background sweeps");
    }

    /// Stop every background sweep. State is kept.
    pub fn close(&self) {
        self.cache.close();
        self.cooldowns.close();
        self.spam.close();
        self.farming.close();
        info!("Stopped background sweeps");
    }

    /// Whether every background sweep is running.
    pub fn is_running(&self) -> bool {
        self.cache.is_sweeping()
            && self.cooldowns.is_sweeping()
            && self.spam.is_sweeping()
            && self.farming.is_sweeping()
    }

    /// Gate a slash command on its configured cooldown.
    #[instrument(skip(self))]
    pub fn on_command(&self, user_id: UserId, command: &str) -> CooldownDecision {
        let decision = self.cooldowns.check_command(user_id, command);
        match &decision {
            CooldownDecision::Allowed { .. } => {
                EventCounters::bump(&self.counters.commands_allowed)
            }
            CooldownDecision::Denied {
                violation_count, ..
            } => {
                EventCounters::bump(&self.counters.commands_denied);
                if *violation_count > 1 {
                    warn!(violation_count, "Repeated command while on cooldown");
                }
            }
        }
        decision
    }

    /// Gate a chat message on the spam window.
    #[instrument(skip(self))]
    pub fn on_message(&self, user_id: UserId) -> SpamVerdict {
        let verdict = self.spam.check_spam(user_id);
        match &verdict {
            SpamVerdict::Clean => EventCounters::bump(&self.counters.messages_clean),
            SpamVerdict::Spamming { reason, .. } => {
                EventCounters::bump(&self.counters.messages_flagged);
                warn!(reason = %reason, "Flagged message as spam");
            }
        }
        verdict
    }

    /// Gate a point award on the farming interval.
    #[instrument(skip(self))]
    pub fn on_points(&self, user_id: UserId) -> FarmingDecision {
        let decision = self.farming.can_proceed(user_id);
        if decision.is_allowed() {
            EventCounters::bump(&self.counters.points_allowed);
        } else {
            EventCounters::bump(&self.counters.points_denied);
        }
        decision
    }

    /// The shared cache.
    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// A configured cache namespace, such as `"leaderboard"`.
    pub fn namespace(&self, name: &str) -> Option<NamedCache> {
        self.config.cache.namespace(name)
    }

    /// The cooldown manager.
    pub fn cooldowns(&self) -> &CommandCooldownManager {
        &self.cooldowns
    }

    /// The spam detector.
    pub fn spam(&self) -> &AntiSpamManager {
        &self.spam
    }

    /// The farming guard.
    pub fn farming(&self) -> &FarmingGuard {
        &self.farming
    }

    /// Snapshot of every component.
    pub fn stats(&self) -> GatekeeperStats {
        GatekeeperStats {
            uptime_secs: self
                .clock
                .now()
                .saturating_duration_since(self.created_at)
                .as_secs(),
            sweeping: self.is_running(),
            cache: self.cache.stats(),
            cooldowns: self.cooldowns.stats(),
            spam: self.spam.stats(),
            farming: self.farming.stats(),
            events: self.counters.snapshot(),
        }
    }
}
