//! Configuration for the guards.
//!
//! All durations are milliseconds. Missing fields take the documented defaults,
//! so a partial TOML section such as
//!
//! ```toml
//! [cooldown]
//! escalation_step_ms = 2_000
//!
//! [cooldown.commands]
//! daily = 86_400_000
//! trivia = 10_000
//! ```
//!
//! is a complete configuration.

use derive_getters::Getters;
use guildhall_error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Command cooldown settings.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default, setter(into))]
pub struct CooldownConfig {
    /// Cooldown for commands without an entry in `commands`
    #[serde(default = "default_cooldown_ms")]
    default_cooldown_ms: u64,

    /// Extra cooldown per denied attempt during the previous window
    #[serde(default = "default_escalation_step_ms")]
    escalation_step_ms: u64,

    /// Interval between sweeps of expired cooldowns
    #[serde(default = "default_cooldown_sweep_ms")]
    sweep_interval_ms: u64,

    /// Per-command base cooldowns
    #[serde(default)]
    commands: HashMap<String, u64>,
}

fn default_cooldown_ms() -> u64 {
    3_000
}

fn default_escalation_step_ms() -> u64 {
    1_000
}

fn default_cooldown_sweep_ms() -> u64 {
    60_000
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            default_cooldown_ms: default_cooldown_ms(),
            escalation_step_ms: default_escalation_step_ms(),
            sweep_interval_ms: default_cooldown_sweep_ms(),
            commands: HashMap::new(),
        }
    }
}

impl CooldownConfig {
    /// Creates a new cooldown config builder.
    pub fn builder() -> CooldownConfigBuilder {
        CooldownConfigBuilder::default()
    }

    /// Base cooldown for `command`, falling back to the default.
    pub fn cooldown_for(&self, command: &str) -> Duration {
        Duration::from_millis(
            self.commands
                .get(command)
                .copied()
                .unwrap_or(self.default_cooldown_ms),
        )
    }

    /// Escalation step as a duration.
    pub fn escalation_step(&self) -> Duration {
        Duration::from_millis(self.escalation_step_ms)
    }

    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Validates the sweep interval.
    ///
    /// Zero cooldowns and a zero escalation step are allowed; they disable the
    /// respective behavior.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::new(
                "cooldown.sweep_interval_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Sliding-window spam detection settings.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default, setter(into))]
pub struct SpamConfig {
    /// Messages within the window that mark a burst, counting the current one
    #[serde(default = "default_message_threshold")]
    message_threshold: usize,

    /// Window length
    #[serde(default = "default_time_window_ms")]
    time_window_ms: u64,

    /// Suggested mute for a flagged user
    #[serde(default = "default_mute_duration_ms")]
    mute_duration_ms: u64,

    /// Interval between sweeps of idle windows
    #[serde(default = "default_spam_sweep_ms")]
    sweep_interval_ms: u64,
}

fn default_message_threshold() -> usize {
    5
}

fn default_time_window_ms() -> u64 {
    5_000
}

fn default_mute_duration_ms() -> u64 {
    30_000
}

fn default_spam_sweep_ms() -> u64 {
    60_000
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            message_threshold: default_message_threshold(),
            time_window_ms: default_time_window_ms(),
            mute_duration_ms: default_mute_duration_ms(),
            sweep_interval_ms: default_spam_sweep_ms(),
        }
    }
}

impl SpamConfig {
    /// Creates a new spam config builder.
    pub fn builder() -> SpamConfigBuilder {
        SpamConfigBuilder::default()
    }

    /// Window length as a duration.
    pub fn time_window(&self) -> Duration {
        Duration::from_millis(self.time_window_ms)
    }

    /// Mute duration as a duration.
    pub fn mute_duration(&self) -> Duration {
        Duration::from_millis(self.mute_duration_ms)
    }

    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Validates threshold, window and sweep interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.message_threshold == 0 {
            return Err(ConfigError::new(
                "spam.message_threshold must be at least 1",
            ));
        }
        if self.time_window_ms == 0 {
            return Err(ConfigError::new(
                "spam.time_window_ms must be greater than zero",
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::new(
                "spam.sweep_interval_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Farming prevention settings.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default, setter(into))]
pub struct FarmingConfig {
    /// Minimum time between point-earning actions
    #[serde(default = "default_min_interval_ms")]
    min_interval_ms: u64,

    /// Interval between sweeps of stale last-action records
    #[serde(default = "default_farming_sweep_ms")]
    sweep_interval_ms: u64,
}

fn default_min_interval_ms() -> u64 {
    30_000
}

fn default_farming_sweep_ms() -> u64 {
    300_000
}

impl Default for FarmingConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            sweep_interval_ms: default_farming_sweep_ms(),
        }
    }
}

impl FarmingConfig {
    /// Creates a new farming config builder.
    pub fn builder() -> FarmingConfigBuilder {
        FarmingConfigBuilder::default()
    }

    /// Minimum interval as a duration.
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Validates the sweep interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::new(
                "farming.sweep_interval_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}
