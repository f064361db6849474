//! Toolkit server: an axum HTTP server with enveloped routes, health probes,
//! TOML configuration, Postgres query helpers and a graceful start/stop
//! lifecycle.

pub mod config;
#[cfg(feature = "postgres")]
pub mod db;
pub mod error;
pub mod logging;
pub mod network;
pub mod rest;

pub use config::{ConfigError, ConfigLoader};
#[cfg(feature = "postgres")]
pub use db::{DatabaseConfig, DbError};
pub use error::ServerError;
pub use logging::{init_tracing, LogFormat};
pub use network::{HealthState, HttpServer, ServerConfig};
pub use rest::{ApiError, Route, Routes};
