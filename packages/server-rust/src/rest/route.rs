//! Route declarations registered on [`HttpServer`](crate::HttpServer).

use std::fmt;

use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{on, MethodFilter, MethodRouter};

use super::path::sanitize_path;

type Mount = Box<dyn FnOnce(MethodFilter) -> MethodRouter + Send>;

/// A method, a path and the handler serving them.
///
/// Paths are sanitized at construction, so `"users/"` and `"/users"` name
/// the same route.
pub struct Route {
    method: Method,
    path: String,
    envelope: bool,
    mount: Mount,
}

/// A list of routes, typically produced by one service.
pub type Routes = Vec<Route>;

impl Route {
    /// A route whose responses are wrapped in the response envelope.
    pub fn new<H, T>(method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::build(method, path, handler, true)
    }

    /// A route whose responses are sent untouched.
    pub fn raw<H, T>(method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::build(method, path, handler, false)
    }

    fn build<H, T>(method: Method, path: &str, handler: H, envelope: bool) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self {
            method,
            path: sanitize_path(path),
            envelope,
            mount: Box::new(move |filter| on(filter, handler)),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether responses go through the response envelope.
    #[must_use]
    pub fn uses_envelope(&self) -> bool {
        self.envelope
    }

    pub(crate) fn into_method_router(self, filter: MethodFilter) -> MethodRouter {
        (self.mount)(filter)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("envelope", &self.envelope)
            .finish_non_exhaustive()
    }
}
