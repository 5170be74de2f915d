//! Configuration for the Canopy CLI
//!
//! Values come from `CANOPY_*` environment variables; command-line flags
//! override them.

use canopy_stdlib::TransportConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::warn;

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Whole-request timeout for data source fetches
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Connect timeout for data source fetches
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// User agent sent with every fetch
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON logs instead of pretty ones
    #[serde(default)]
    pub log_json: bool,

    /// How long to wait for all fetches to settle
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_log_filter() -> String {
    "info,canopy=debug".to_string()
}

fn default_settle_timeout_ms() -> u64 {
    10_000
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: None,
            log_filter: default_log_filter(),
            log_json: false,
            settle_timeout_ms: default_settle_timeout_ms(),
        }
    }
}

impl CliConfig {
    /// Load configuration from the process environment
    pub fn load() -> Self {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup("CANOPY_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                config.request_timeout_ms = ms;
            } else {
                warn!("Invalid CANOPY_REQUEST_TIMEOUT_MS value: {}", value);
            }
        }

        if let Some(value) = lookup("CANOPY_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                config.connect_timeout_ms = ms;
            } else {
                warn!("Invalid CANOPY_CONNECT_TIMEOUT_MS value: {}", value);
            }
        }

        if let Some(user_agent) = lookup("CANOPY_USER_AGENT") {
            config.user_agent = Some(user_agent);
        }

        if let Some(filter) = lookup("CANOPY_LOG_FILTER") {
            config.log_filter = filter;
        }

        if let Some(value) = lookup("CANOPY_LOG_JSON") {
            config.log_json = value.to_lowercase() == "true" || value == "1";
        }

        if let Some(value) = lookup("CANOPY_SETTLE_TIMEOUT_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                config.settle_timeout_ms = ms;
            } else {
                warn!("Invalid CANOPY_SETTLE_TIMEOUT_MS value: {}", value);
            }
        }

        config
    }

    /// Settings for the HTTP transport
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            request_timeout_ms: self.request_timeout_ms,
            connect_timeout_ms: self.connect_timeout_ms,
            user_agent: self.user_agent.clone(),
        }
    }

    /// Deadline for a render session to settle
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}
