//! Errors raised by the process lifecycle itself.
//!
//! Errors returned by a process's own `run` and `interrupt` capabilities are
//! passed through as `anyhow::Error` without being wrapped in these variants.

/// Failures owned by the lifecycle machinery rather than by the process body.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The process is missing its `run` or `interrupt` capability (or both).
    #[error("invalid process: both run and interrupt must be provided")]
    InvalidProcess,
    /// The OS signal streams could not be registered.
    #[error("failed to register shutdown signal handler: {0}")]
    SignalSetup(#[from] std::io::Error),
    /// A panic caught by the safe invoker whose payload was not an error.
    ///
    /// Displays exactly the panic message so that `panic!("2")` and
    /// `panic_any(2)` both surface as `"2"`.
    #[error("{message}")]
    Panicked { message: String },
    /// The run task was dropped before it could report a result, which only
    /// happens when the runtime shuts down underneath it.
    #[error("process run task was dropped before reporting a result")]
    RunAbandoned,
}
