//! HTTP server, its configuration, middleware and shutdown control.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use handlers::AppState;
pub use middleware::{build_http_layers, track_in_flight, RequestSpan, REQUEST_ID_HEADER};
pub use server::HttpServer;
pub use shutdown::{HealthState, InFlightGuard, ShutdownController};
