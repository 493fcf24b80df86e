//! ## mqscope-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! Installs the global `tracing-subscriber` once at startup. `RUST_LOG`
//! overrides the configured filter.

use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. Does nothing if one is already set.
    pub fn init(default_filter: &str, json: bool) {
        let filter = Self::filter(default_filter);
        let builder = fmt().with_env_filter(filter).with_thread_names(true);

        let result = if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "tracing subscriber already installed");
        }
    }

    fn filter(default_filter: &str) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}
