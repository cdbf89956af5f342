//! Cache and rate-limit gatekeeper for a community Discord bot.
//!
//! [`Gatekeeper`] owns a [`TtlCache`](guildhall_cache::TtlCache) and the three
//! per-user guards, built from one [`GuildhallConfig`] and reading one clock.
//! Event handlers call [`Gatekeeper::on_command`], [`Gatekeeper::on_message`]
//! and [`Gatekeeper::on_points`] before doing any work; the monitoring API in
//! [`api`] serves `/health` and `/stats`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
mod cli;
mod config;
mod gatekeeper;

pub use cli::Cli;
pub use config::{GuildhallConfig, ServerConfig};
pub use gatekeeper::{EventStats, Gatekeeper, GatekeeperStats};

pub use guildhall_cache::{CacheConfig, CacheStats, NamedCache, TtlCache};
pub use guildhall_core::{
    Clock, ManualClock, SharedClock, SystemClock, TracingHandle, init_tracing,
};
pub use guildhall_error::{GuildhallError, GuildhallErrorKind, GuildhallResult};
pub use guildhall_rate_limit::{
    AntiSpamManager, CommandCooldownManager, CooldownConfig, CooldownDecision, FarmingConfig,
    FarmingDecision, FarmingGuard, SpamConfig, SpamVerdict, UserId,
};
