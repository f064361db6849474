//! Graceful process lifecycle: panic-safe invocation, shutdown signals, and
//! the coordinator racing a process against its interruption.

pub mod coordinator;
pub mod error;
pub mod operation;
pub mod runnable;
pub mod safe_run;
pub mod signals;

pub use coordinator::{start_with_signal_handler, LifecycleCoordinator, LifecycleState, WaitHandle};
pub use error::ProcessError;
pub use operation::{BoxFuture, InterruptFn, Process, RunFn};
pub use runnable::{start_runnable_with_signal_handler, Runnable};
pub use safe_run::{error_from_panic, safe_run, safe_run_async, safe_run_sync, PanicPayload};
pub use signals::{ShutdownSignal, ShutdownSignals, SignalSubscription};
