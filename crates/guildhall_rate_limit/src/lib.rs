//! Per-user guards for inbound bot events.
//!
//! Each guard answers one question before the caller does any work:
//!
//! - [`CommandCooldownManager`]: may this user run this command yet?
//!   Repeated attempts during a cooldown lengthen the next one.
//! - [`AntiSpamManager`]: is this message part of a burst?
//! - [`FarmingGuard`]: has enough time passed since the user last earned points?
//!
//! Denials are ordinary return values, not errors. Every guard keeps its own
//! map behind a mutex, performs each check under a single lock acquisition and
//! can run a background sweep that evicts records with nothing left to enforce.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod cooldown;
mod farming;
mod spam;

pub use config::{
    CooldownConfig, CooldownConfigBuilder, FarmingConfig, FarmingConfigBuilder, SpamConfig,
    SpamConfigBuilder,
};
pub use cooldown::{
    CommandCooldownManager, CooldownDecision, CooldownRecord, CooldownStats, MAX_COOLDOWN,
};
pub use farming::{FarmingDecision, FarmingGuard, FarmingStats};
pub use spam::{AntiSpamManager, SpamStats, SpamVerdict};

/// Discord user snowflake.
pub type UserId = u64;
