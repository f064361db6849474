//! Built-in handlers served next to the registered routes.
//!
//! `AppState` is the shared state carried through axum extractors.

pub mod health;

pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;

/// Shared state passed to the built-in handlers via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Server creation time, used for uptime calculation.
    pub start_time: Instant,
}
