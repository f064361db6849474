//! Adapter from start/stop style services to a [`Process`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::coordinator::{start_with_signal_handler, WaitHandle};
use super::error::ProcessError;
use super::operation::Process;

/// A service that blocks in `start` until `stop` is called.
///
/// `stop` may be called while `start` is still running, after it returned on
/// its own, or before it was ever called; implementations must handle all
/// three.
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    /// Runs the service until it is stopped or fails.
    async fn start(&self) -> anyhow::Result<()>;

    /// Asks a running `start` to return.
    async fn stop(&self) -> anyhow::Result<()>;
}

impl Process {
    /// Lifts a [`Runnable`] into a process with `run = start` and
    /// `interrupt = stop`.
    #[must_use]
    pub fn from_runnable<R: Runnable>(runnable: Arc<R>) -> Self {
        let for_stop = Arc::clone(&runnable);
        Self::new()
            .with_run(move || async move { runnable.start().await })
            .with_interrupt(move || async move { for_stop.stop().await })
    }
}

/// Starts a [`Runnable`] under the default shutdown signal handler.
///
/// # Errors
///
/// Returns [`ProcessError::SignalSetup`] if the signal streams cannot be
/// registered.
pub fn start_runnable_with_signal_handler<R: Runnable>(
    ctx: &CancellationToken,
    runnable: Arc<R>,
) -> Result<WaitHandle, ProcessError> {
    start_with_signal_handler(ctx, Process::from_runnable(runnable))
}
