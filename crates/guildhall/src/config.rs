//! Top-level configuration.
//!
//! Sources in order of precedence (later sources override earlier):
//! 1. Bundled defaults (`guildhall.toml` shipped with the crate)
//! 2. User config in the home directory (`~/.config/guildhall/guildhall.toml`)
//! 3. User config in the current directory (`./guildhall.toml`)
//! 4. Environment variables such as `GUILDHALL__SPAM__MESSAGE_THRESHOLD=8`
//!
//! User config files are optional and skipped when missing.

use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use guildhall_cache::CacheConfig;
use guildhall_error::{ConfigError, GuildhallError, GuildhallResult};
use guildhall_rate_limit::{CooldownConfig, FarmingConfig, SpamConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../guildhall.toml");

/// Monitoring server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct ServerConfig {
    /// Address the monitoring API listens on
    #[serde(default = "default_bind_addr")]
    bind_addr: String,

    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8089".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Parse the bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr.parse().map_err(|e| {
            ConfigError::new(format!(
                "server.bind_addr '{}' is not a socket address: {}",
                self.bind_addr, e
            ))
        })
    }
}

/// Complete configuration for every component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildhallConfig {
    /// TTL cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Command cooldown settings
    #[serde(default)]
    pub cooldown: CooldownConfig,

    /// Spam detection settings
    #[serde(default)]
    pub spam: SpamConfig,

    /// Farming guard settings
    #[serde(default)]
    pub farming: FarmingConfig,

    /// Monitoring server settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl GuildhallConfig {
    /// Load configuration from every source, see the module docs for precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source cannot be parsed or the result
    /// fails validation.
    pub fn load() -> GuildhallResult<Self> {
        debug!("Loading configuration: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/guildhall/guildhall.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("guildhall").required(false))
            .add_source(
                Environment::with_prefix("GUILDHALL")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder)
    }

    /// Load bundled defaults overridden by a single file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the result
    /// fails validation.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> GuildhallResult<Self> {
        debug!("Loading configuration from file");

        if !path.as_ref().exists() {
            return Err(ConfigError::new(format!(
                "Configuration file not found: {}",
                path.as_ref().display()
            ))
            .into());
        }

        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()));

        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> GuildhallResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| {
                GuildhallError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                GuildhallError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.cooldown.validate()?;
        self.spam.validate()?;
        self.farming.validate()?;
        self.server.socket_addr()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_defaults_parse() {
        let config: GuildhallConfig = toml_defaults();
        assert_eq!(*config.spam.message_threshold(), 5);
        assert_eq!(*config.farming.min_interval_ms(), 30_000);
        assert_eq!(config.cooldown.cooldown_for("daily").as_secs(), 86_400);
        assert!(config.cache.namespace("leaderboard").is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bundled_defaults_match_struct_defaults() {
        let bundled = toml_defaults();
        let defaults = GuildhallConfig::default();
        assert_eq!(bundled.spam, defaults.spam);
        assert_eq!(bundled.farming, defaults.farming);
        assert_eq!(bundled.cache, defaults.cache);
        assert_eq!(bundled.server, defaults.server);
    }

    #[test]
    fn test_invalid_bind_addr_fails_validation() {
        let mut config = GuildhallConfig::default();
        config.server = config.server.with_bind_addr("not an address".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.message.contains("bind_addr"));
    }

    fn toml_defaults() -> GuildhallConfig {
        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
