//! HTTP server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for [`HttpServer`](super::HttpServer).
///
/// Durations are stored as milliseconds so the struct maps directly onto a
/// config file section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Prefix prepended to every route path, health probes included.
    pub base_path: String,
    /// How long `stop` waits for the server to finish shutting down.
    pub shutdown_timeout_ms: u64,
    /// Maximum time to wait for a request to complete.
    pub request_timeout_ms: u64,
    /// Allowed CORS origins. `"*"` allows any origin.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Shutdown timeout as a [`Duration`].
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `host:port` string handed to the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            base_path: "/".to_string(),
            shutdown_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            cors_origins: vec!["*".to_string()],
        }
    }
}
