//! Logging setup

use crate::config::ServerConfig;
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Primary log filter (RUST_LOG env var)
    pub log_filter: String,
    /// Fallback log level if RUST_LOG not set
    pub default_level: String,
    /// Log format ("human" or "json")
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Human,
    Json,
}

impl TelemetryConfig {
    /// Telemetry config honoring the server's configured log level
    pub fn with_server_config(server_config: &ServerConfig) -> Self {
        let default_level =
            env::var("LOG_LEVEL").unwrap_or_else(|_| server_config.log_level.clone());
        Self::from_env_with_defaults(default_level)
    }

    fn from_env_with_defaults(default_level: String) -> Self {
        Self {
            log_filter: env::var("RUST_LOG").unwrap_or_default(),
            default_level,
            log_format: match env::var("LOG_FORMAT")
                .unwrap_or_default()
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Human,
            },
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.log_filter.is_empty() {
            EnvFilter::new(&self.default_level)
        } else {
            EnvFilter::new(&self.log_filter)
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_env_with_defaults(env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
    }
}

/// Install the global tracing subscriber.
///
/// Safe to call multiple times - will only initialize once.
pub fn init_logging(config: &TelemetryConfig) {
    if tracing::dispatcher::has_been_set() {
        tracing::debug!("tracing subscriber already initialized, skipping");
        return;
    }

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Human => tracing_subscriber::fmt::layer().compact().boxed(),
    };

    // try_init: another thread may have set the subscriber since the check
    let _ = tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init();
}
