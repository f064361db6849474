//! Graceful shutdown controller with in-flight request tracking.
//!
//! Uses `ArcSwap` for lock-free health state transitions and an atomic
//! counter with RAII guards for accurate in-flight request tracking.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{watch, Notify};

/// Server health state, transitioned by the shutdown controller.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Server is initializing (not yet accepting requests).
    Starting,
    /// Server is fully operational and accepting requests.
    Ready,
    /// Shutdown was requested; no new requests are accepted.
    Draining,
    /// Server has fully stopped.
    Stopped,
}

impl HealthState {
    /// Lowercase name reported by the health endpoint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

/// Controls graceful shutdown with health state management and in-flight tracking.
///
/// 1. Health probes check `health_state()` to report readiness
/// 2. Middleware checks state before accepting new requests
/// 3. `trigger_shutdown()` moves to Draining and signals the serve loop
/// 4. `mark_stopped()` is called once the serve loop returned
/// 5. `wait_for_stopped()` lets `stop` callers block on step 4
#[derive(Debug)]
pub struct ShutdownController {
    shutdown_signal: watch::Sender<bool>,
    in_flight: Arc<AtomicU64>,
    health_state: Arc<ArcSwap<HealthState>>,
    stopped: Notify,
}

impl ShutdownController {
    /// Creates a new shutdown controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shutdown_signal: tx,
            in_flight: Arc::new(AtomicU64::new(0)),
            health_state: Arc::new(ArcSwap::from_pointee(HealthState::Starting)),
            stopped: Notify::new(),
        }
    }

    /// Transitions to the `Ready` state, indicating the server can accept requests.
    ///
    /// No-op once shutdown was requested.
    pub fn set_ready(&self) {
        if !self.is_shutdown_requested() {
            self.health_state.store(Arc::new(HealthState::Ready));
        }
    }

    /// Returns `true` once `trigger_shutdown()` has been called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        *self.shutdown_signal.borrow()
    }

    /// Returns a future that resolves once shutdown is triggered.
    ///
    /// Resolves immediately if shutdown was already requested.
    pub fn shutdown_requested(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown_signal.subscribe();
        async move {
            loop {
                let requested = *rx.borrow_and_update();
                if requested {
                    return;
                }
                // Sender gone means nobody can ever request shutdown; stop anyway.
                if rx.changed().await.is_err() {
                    return;
                }
            }
        }
    }

    /// Initiates graceful shutdown.
    ///
    /// Transitions to `Draining` (unless already `Stopped`) and signals the
    /// serve loop. Calling it more than once is harmless.
    pub fn trigger_shutdown(&self) {
        if self.health_state() != HealthState::Stopped {
            self.health_state.store(Arc::new(HealthState::Draining));
        }
        self.shutdown_signal.send_replace(true);
    }

    /// Records that the serve loop has returned and wakes `wait_for_stopped` callers.
    pub fn mark_stopped(&self) {
        self.health_state.store(Arc::new(HealthState::Stopped));
        self.stopped.notify_waiters();
    }

    /// Waits until `mark_stopped()` has been called, up to the given timeout.
    ///
    /// Returns `false` if the timeout expired first.
    pub async fn wait_for_stopped(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.stopped.notified();
                if self.health_state() == HealthState::Stopped {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }

    /// Returns the current health state.
    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }

    /// Creates an RAII guard that tracks an in-flight request.
    ///
    /// The in-flight counter is incremented on creation and decremented
    /// when the guard is dropped, even if the handler panics.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Returns the current number of in-flight requests.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that decrements the in-flight counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_starting() {
        let controller = ShutdownController::new();
        assert_eq!(controller.health_state(), HealthState::Starting);
        assert_eq!(controller.in_flight_count(), 0);
        assert!(!controller.is_shutdown_requested());
    }

    #[test]
    fn health_state_transitions_starting_ready_draining_stopped() {
        let controller = ShutdownController::new();

        controller.set_ready();
        assert_eq!(controller.health_state(), HealthState::Ready);

        controller.trigger_shutdown();
        assert_eq!(controller.health_state(), HealthState::Draining);
        assert!(controller.is_shutdown_requested());

        controller.mark_stopped();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }

    #[test]
    fn set_ready_after_trigger_keeps_draining() {
        let controller = ShutdownController::new();
        controller.trigger_shutdown();
        controller.set_ready();
        assert_eq!(controller.health_state(), HealthState::Draining);
    }

    #[test]
    fn trigger_after_stop_keeps_stopped() {
        let controller = ShutdownController::new();
        controller.mark_stopped();
        controller.trigger_shutdown();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }

    #[test]
    fn in_flight_guard_increments_and_decrements() {
        let controller = ShutdownController::new();

        let guard1 = controller.in_flight_guard();
        let guard2 = controller.in_flight_guard();
        assert_eq!(controller.in_flight_count(), 2);

        drop(guard1);
        assert_eq!(controller.in_flight_count(), 1);

        drop(guard2);
        assert_eq!(controller.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_requested_resolves_after_trigger() {
        let controller = Arc::new(ShutdownController::new());
        let requested = controller.shutdown_requested();

        let trigger = Arc::clone(&controller);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger_shutdown();
        });

        tokio::time::timeout(Duration::from_secs(1), requested)
            .await
            .expect("shutdown should be observed");
    }

    #[tokio::test]
    async fn shutdown_requested_resolves_immediately_when_already_triggered() {
        let controller = ShutdownController::new();
        controller.trigger_shutdown();

        tokio::time::timeout(Duration::from_millis(50), controller.shutdown_requested())
            .await
            .expect("already requested");
    }

    #[tokio::test]
    async fn wait_for_stopped_succeeds_once_marked() {
        let controller = Arc::new(ShutdownController::new());
        let marker = Arc::clone(&controller);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            marker.mark_stopped();
        });

        assert!(controller.wait_for_stopped(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn wait_for_stopped_times_out() {
        let controller = ShutdownController::new();
        controller.set_ready();
        assert!(!controller.wait_for_stopped(Duration::from_millis(50)).await);
    }

    #[test]
    fn health_state_names() {
        assert_eq!(HealthState::Starting.as_str(), "starting");
        assert_eq!(HealthState::Ready.as_str(), "ready");
        assert_eq!(HealthState::Draining.as_str(), "draining");
        assert_eq!(HealthState::Stopped.as_str(), "stopped");
    }
}
