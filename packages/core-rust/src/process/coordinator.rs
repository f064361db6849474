//! Races a process's `run` body against an external interruption.
//!
//! # Resolution
//!
//! ```text
//! start:  validate -> subscribe to signals -> spawn run (safe) -> WaitHandle
//!
//! wait:   select {
//!           token cancelled  => outcome = interrupt().await
//!                               if run already delivered Err(e): outcome = Err(e)
//!           run delivered r  => outcome = r   (interrupt never called)
//!         }
//!         release signal subscription
//! ```
//!
//! A run error that is already sitting in the completion channel when the
//! interrupt returns wins over the interrupt's outcome. The reverse is never
//! checked: once the run path resolves, `interrupt` is not consulted.

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::ProcessError;
use super::operation::{InterruptFn, Process};
use super::safe_run::safe_run_async;
use super::signals::{ShutdownSignals, SignalSubscription};

/// Phase of a single lifecycle.
///
/// State machine: Created -> Running -> (Interrupting ->) Resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// The process was handed to the coordinator but not validated yet.
    Created,
    /// The run body is executing on its own task.
    Running,
    /// The interruption fired and `interrupt` is being awaited.
    Interrupting,
    /// The outcome is fixed.
    Resolved,
}

impl LifecycleState {
    /// Lowercase name used in log events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Interrupting => "interrupting",
            Self::Resolved => "resolved",
        }
    }
}

/// Starts processes under a configured set of shutdown signals.
#[derive(Debug, Clone, Default)]
pub struct LifecycleCoordinator {
    signals: ShutdownSignals,
}

impl LifecycleCoordinator {
    /// Creates a coordinator that reacts to `signals` in addition to context
    /// cancellation.
    #[must_use]
    pub fn new(signals: ShutdownSignals) -> Self {
        Self { signals }
    }

    /// Signals this coordinator subscribes to.
    #[must_use]
    pub fn signals(&self) -> &ShutdownSignals {
        &self.signals
    }

    /// Launches `process.run` on its own task and returns without blocking.
    ///
    /// The returned handle resolves once `ctx` is cancelled, one of the
    /// configured signals is delivered, or `run` returns on its own. Must be
    /// called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::InvalidProcess`] if `run` or `interrupt` is missing.
    ///   Nothing is spawned or registered in that case.
    /// - [`ProcessError::SignalSetup`] if the signal streams cannot be
    ///   registered.
    pub fn start(
        &self,
        ctx: &CancellationToken,
        process: Process,
    ) -> Result<WaitHandle, ProcessError> {
        debug!(state = LifecycleState::Created.as_str(), "validating process");
        let (run, interrupt) = process.into_parts().ok_or(ProcessError::InvalidProcess)?;

        // Subscribe before spawning so an early signal is not lost.
        let interrupted = ctx.child_token();
        let subscription = self.signals.subscribe(interrupted.clone())?;

        // `run` is called inside the contained future: a panic raised before
        // it yields a future must also surface through `wait`.
        let done = safe_run_async(async move { run().await });
        debug!(state = LifecycleState::Running.as_str(), "process started");

        Ok(WaitHandle {
            interrupted,
            interrupt,
            done,
            subscription,
        })
    }
}

/// Starts `process` with the default shutdown signals.
///
/// # Errors
///
/// Same as [`LifecycleCoordinator::start`].
pub fn start_with_signal_handler(
    ctx: &CancellationToken,
    process: Process,
) -> Result<WaitHandle, ProcessError> {
    LifecycleCoordinator::default().start(ctx, process)
}

/// Pending outcome of a started process.
///
/// Dropping the handle without waiting releases the signal subscription but
/// leaves the run task alone.
#[must_use = "a started process only resolves through `wait`"]
pub struct WaitHandle {
    interrupted: CancellationToken,
    interrupt: InterruptFn,
    done: oneshot::Receiver<anyhow::Result<()>>,
    subscription: SignalSubscription,
}

impl WaitHandle {
    /// Blocks until the lifecycle resolves and returns its single outcome.
    ///
    /// Cancellation is cooperative: when the interruption wins, `interrupt`
    /// is awaited and its outcome returned even if `run` keeps going. A run
    /// body that ignores its interrupt is left running in the background and
    /// nothing observes it afterwards.
    ///
    /// `interrupt` is called directly, outside the safe invoker; a panic in it
    /// unwinds into the caller.
    ///
    /// The signal subscription is released before returning, but the OS
    /// default disposition is not restored: a signal delivered afterwards is
    /// absorbed by tokio's handler and no longer terminates the process.
    ///
    /// # Errors
    ///
    /// Returns the run error, the interrupt error, the error reconstructed
    /// from a panic in `run`, or [`ProcessError::RunAbandoned`] if the run
    /// task vanished without reporting.
    pub async fn wait(self) -> anyhow::Result<()> {
        let Self {
            interrupted,
            interrupt,
            mut done,
            mut subscription,
        } = self;

        let outcome = tokio::select! {
            () = interrupted.cancelled() => interrupt_and_recheck(interrupt, &mut done).await,
            delivered = &mut done => {
                debug!("process returned on its own");
                delivered.unwrap_or_else(|_| Err(ProcessError::RunAbandoned.into()))
            }
        };

        subscription.release().await;

        match &outcome {
            Ok(()) => debug!(state = LifecycleState::Resolved.as_str(), "process stopped cleanly"),
            Err(err) => debug!(
                state = LifecycleState::Resolved.as_str(),
                error = %err,
                "process stopped with error"
            ),
        }
        outcome
    }
}

/// Runs the interrupt, then polls the completion slot once without waiting.
async fn interrupt_and_recheck(
    interrupt: InterruptFn,
    done: &mut oneshot::Receiver<anyhow::Result<()>>,
) -> anyhow::Result<()> {
    debug!(state = LifecycleState::Interrupting.as_str(), "interrupting process");
    let outcome = interrupt().await;

    match done.try_recv() {
        Ok(Err(run_err)) => {
            debug!(error = %run_err, "run error overrides interrupt outcome");
            Err(run_err)
        }
        _ => outcome,
    }
}
