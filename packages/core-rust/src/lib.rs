//! Backend toolkit core: panic-safe invocation and graceful process lifecycle.

pub mod process;

pub use process::{
    start_runnable_with_signal_handler, start_with_signal_handler, LifecycleCoordinator,
    Process, ProcessError, Runnable, ShutdownSignal, ShutdownSignals, WaitHandle,
};
pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
