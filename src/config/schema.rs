//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::AuthPolicy;

/// Address used when none is configured: all interfaces, the well-known port.
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:22";

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, keep-alive).
    pub listener: ListenerConfig,

    /// Accept retry backoff.
    pub backoff: BackoffConfig,

    /// Private host key files loaded at startup.
    pub host_keys: Vec<PathBuf>,

    /// Client authentication settings.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:2222").
    pub address: String,

    /// TCP keep-alive period for accepted sockets, in seconds.
    pub keepalive_secs: u64,

    /// Trace every read and write on raw connections.
    pub debug_connections: bool,
}

impl ListenerConfig {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_LISTEN_ADDRESS.to_string(),
            keepalive_secs: 180,
            debug_connections: false,
        }
    }
}

/// Backoff applied after temporary accept errors.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First retry delay in milliseconds.
    pub initial_delay_ms: u64,

    /// Maximum retry delay in milliseconds.
    pub max_delay_ms: u64,
}

impl BackoffConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 5,
            max_delay_ms: 1000,
        }
    }
}

/// Client authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Let clients in without authenticating.
    pub no_client_auth: bool,
}

impl AuthConfig {
    pub fn policy(&self) -> AuthPolicy {
        if self.no_client_auth {
            AuthPolicy::NoClientAuth
        } else {
            AuthPolicy::Required
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
