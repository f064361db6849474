//! Errors raised while assembling and running the HTTP server.

use axum::http::Method;

/// Errors returned by [`HttpServer`](crate::HttpServer).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Only GET, POST, DELETE and PATCH routes can be registered.
    #[error("unsupported method {method}")]
    UnsupportedMethod { method: Method },

    /// The same method and path were registered twice.
    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },

    /// Routes cannot be added, and the server cannot be started, twice.
    #[error("server already started")]
    AlreadyStarted,

    /// Binding the listener failed.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The serve loop failed after binding.
    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),

    /// The server did not finish shutting down in time.
    #[error("server did not stop within {timeout_ms}ms")]
    ShutdownTimeout { timeout_ms: u64 },
}
