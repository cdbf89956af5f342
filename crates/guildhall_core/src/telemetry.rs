//! Tracing subscriber setup.
//!
//! Tracing is installed before configuration is loaded so that config loading
//! itself is logged. The configured level is applied afterwards through the
//! returned [`TracingHandle`].

use guildhall_error::{GuildhallResult, ServerError, ServerErrorKind};
use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt};

/// Handle to the installed filter.
#[derive(Debug, Clone)]
pub struct TracingHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl TracingHandle {
    /// Replace the filter with `directives`, e.g. the configured `log_level`.
    ///
    /// A filter taken from `RUST_LOG` always wins; in that case nothing changes
    /// and `Ok(false)` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if `directives` do not parse or the subscriber is gone.
    pub fn apply_level(&self, directives: &str) -> GuildhallResult<bool> {
        if self.from_env {
            tracing::debug!(directives, "RUST_LOG set, keeping environment filter");
            return Ok(false);
        }

        let filter = EnvFilter::try_new(directives).map_err(|e| {
            ServerError::new(ServerErrorKind::Telemetry(format!(
                "Invalid log filter '{}': {}",
                directives, e
            )))
        })?;
        self.filter
            .reload(filter)
            .map_err(|e| ServerError::new(ServerErrorKind::Telemetry(e.to_string())))?;

        tracing::debug!(directives, "Applied configured log filter");
        Ok(true)
    }

    /// The active filter directives.
    pub fn current(&self) -> Option<String> {
        self.filter.with_current(|f| f.to_string()).ok()
    }
}

/// Build the subscriber without installing it.
///
/// `env_directives` stands in for `RUST_LOG`; when present it is used instead
/// of `default_filter`.
fn build_subscriber(
    default_filter: &str,
    env_directives: Option<&str>,
) -> (impl Subscriber + Send + Sync + 'static, TracingHandle) {
    let (filter, from_env) = match env_directives.map(EnvFilter::try_new) {
        Some(Ok(filter)) => (filter, true),
        _ => (EnvFilter::new(default_filter), false),
    };
    let (filter_layer, filter) = reload::Layer::new(filter);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    let subscriber = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer);

    (subscriber, TracingHandle { filter, from_env })
}

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set and falls back to `default_filter`
/// (for example `"info"` or `"guildhall_rate_limit=debug"`).
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> GuildhallResult<TracingHandle> {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (subscriber, handle) = build_subscriber(default_filter, env_directives.as_deref());

    subscriber
        .try_init()
        .map_err(|e| ServerError::new(ServerErrorKind::Telemetry(e.to_string())))?;

    Ok(handle)
}
