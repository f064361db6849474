//! HTTP server with route registration and a start/stop lifecycle.
//!
//! Routes are collected before the server starts. `start` binds the
//! listener, assembles the router and serves until `stop` is called; the
//! server implements [`Runnable`] so it can be driven by the lifecycle
//! coordinator.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::http::Method;
use axum::routing::{get, MethodFilter};
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use toolkit_core::Runnable;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{debug, info, warn};

use super::config::ServerConfig;
use super::handlers::{health_handler, liveness_handler, readiness_handler, AppState};
use super::middleware::{build_http_layers, track_in_flight};
use super::shutdown::ShutdownController;
use crate::error::ServerError;
use crate::rest::{concatenate_endpoints, panic_response, response_envelope, Route, Routes};

const HEALTH_PATHS: [&str; 3] = ["health", "health/live", "health/ready"];

struct RouteTable {
    /// Taken by `start`; `None` means the server has started.
    router: Option<Router>,
    registered: HashSet<(Method, String)>,
}

/// HTTP server serving registered [`Route`]s next to built-in health probes.
///
/// Lifecycle:
/// 1. `new()` -- allocates the route table and shutdown controller
/// 2. `add_route()` -- registers routes under the configured base path
/// 3. `start()` -- binds, serves, and returns once stopped
/// 4. `stop()` -- triggers graceful shutdown and waits for `start` to return
pub struct HttpServer {
    config: ServerConfig,
    routes: Mutex<RouteTable>,
    shutdown: Arc<ShutdownController>,
    local_addr: Mutex<Option<SocketAddr>>,
    created_at: Instant,
}

impl HttpServer {
    /// Creates a server without binding any port.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let registered = HEALTH_PATHS
            .iter()
            .map(|path| (Method::GET, concatenate_endpoints(&config.base_path, path)))
            .collect();

        Self {
            config,
            routes: Mutex::new(RouteTable {
                router: Some(Router::new()),
                registered,
            }),
            shutdown: Arc::new(ShutdownController::new()),
            local_addr: Mutex::new(None),
            created_at: Instant::now(),
        }
    }

    /// Registers a route under the configured base path.
    ///
    /// # Errors
    ///
    /// - [`ServerError::UnsupportedMethod`] for anything but GET, POST, DELETE and PATCH
    /// - [`ServerError::DuplicateRoute`] when the method and path are already taken
    /// - [`ServerError::AlreadyStarted`] once `start` was called
    pub fn add_route(&self, route: Route) -> Result<(), ServerError> {
        let method = route.method().clone();
        let filter = match method {
            Method::GET => MethodFilter::GET,
            Method::POST => MethodFilter::POST,
            Method::DELETE => MethodFilter::DELETE,
            Method::PATCH => MethodFilter::PATCH,
            _ => return Err(ServerError::UnsupportedMethod { method }),
        };
        let path = concatenate_endpoints(&self.config.base_path, route.path());

        let mut table = self.routes.lock();
        let Some(router) = table.router.take() else {
            return Err(ServerError::AlreadyStarted);
        };
        if !table.registered.insert((method.clone(), path.clone())) {
            table.router = Some(router);
            return Err(ServerError::DuplicateRoute { method, path });
        }

        let envelope = route.uses_envelope();
        let mut method_router = route
            .into_method_router(filter)
            .layer(CatchPanicLayer::custom(panic_response));
        if envelope {
            method_router = method_router.layer(axum::middleware::from_fn(response_envelope));
        }
        table.router = Some(router.route(&path, method_router));

        debug!(%method, path = %path, envelope, "registered route");
        Ok(())
    }

    /// Registers every route of the list, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// See [`add_route`](Self::add_route).
    pub fn add_routes(&self, routes: Routes) -> Result<(), ServerError> {
        routes.into_iter().try_for_each(|route| self.add_route(route))
    }

    /// Address the listener is bound to, once started.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn has_started(&self) -> bool {
        self.routes.lock().router.is_none()
    }

    fn build_app(&self, routes: Router) -> Router {
        let state = AppState {
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.created_at,
        };
        let base_path = &self.config.base_path;

        let health = Router::new()
            .route(
                &concatenate_endpoints(base_path, HEALTH_PATHS[0]),
                get(health_handler),
            )
            .route(
                &concatenate_endpoints(base_path, HEALTH_PATHS[1]),
                get(liveness_handler),
            )
            .route(
                &concatenate_endpoints(base_path, HEALTH_PATHS[2]),
                get(readiness_handler),
            )
            .with_state(state);

        routes
            .layer(axum::middleware::from_fn_with_state(
                Arc::clone(&self.shutdown),
                track_in_flight,
            ))
            .merge(health)
            .layer(build_http_layers(&self.config))
    }

    async fn serve(&self, routes: Router) -> Result<(), ServerError> {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let bound = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { address, source })?;
        *self.local_addr.lock() = Some(bound);

        let app = self.build_app(routes);
        self.shutdown.set_ready();
        info!(address = %bound, "server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.shutdown.shutdown_requested())
            .await
            .map_err(ServerError::Serve)?;

        info!(address = %bound, "server gracefully stopped");
        Ok(())
    }
}

#[async_trait]
impl Runnable for HttpServer {
    /// Serves until [`stop`](Runnable::stop) is called.
    ///
    /// Returns `Ok(())` on graceful shutdown, including when `stop` came
    /// first and the server never bound.
    async fn start(&self) -> anyhow::Result<()> {
        let routes = self
            .routes
            .lock()
            .router
            .take()
            .ok_or(ServerError::AlreadyStarted)?;

        if self.shutdown.is_shutdown_requested() {
            debug!("stop requested before start, not binding");
            self.shutdown.mark_stopped();
            return Ok(());
        }

        let result = self.serve(routes).await;
        self.shutdown.mark_stopped();
        if let Err(err) = &result {
            warn!(error = %err, "server failed");
        }
        Ok(result?)
    }

    /// Triggers graceful shutdown and waits for `start` to return.
    async fn stop(&self) -> anyhow::Result<()> {
        self.shutdown.trigger_shutdown();
        if !self.has_started() {
            return Ok(());
        }

        let timeout = self.config.shutdown_timeout();
        if self.shutdown.wait_for_stopped(timeout).await {
            Ok(())
        } else {
            Err(ServerError::ShutdownTimeout {
                timeout_ms: self.config.shutdown_timeout_ms,
            }
            .into())
        }
    }
}
