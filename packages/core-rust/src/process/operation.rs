//! The unit of work managed by a lifecycle: a `run` body and the `interrupt`
//! that makes it return.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future produced by a process capability.
pub type BoxFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Main body of work. May run for an unbounded time until interrupted.
pub type RunFn = Box<dyn FnOnce() -> BoxFuture + Send + 'static>;

/// Asks the run body to stop. Must tolerate being called after `run` has
/// already returned on its own.
pub type InterruptFn = Box<dyn FnOnce() -> BoxFuture + Send + 'static>;

/// A `run`/`interrupt` pair.
///
/// Both capabilities are optional at construction time so that an incomplete
/// process can be built and rejected by [`Process::is_valid`] before anything
/// is executed.
///
/// ```
/// use toolkit_core::Process;
///
/// let process = Process::new()
///     .with_run(|| async { Ok(()) })
///     .with_interrupt(|| async { Ok(()) });
/// assert!(process.is_valid());
/// ```
#[derive(Default)]
pub struct Process {
    run: Option<RunFn>,
    interrupt: Option<InterruptFn>,
}

impl Process {
    /// Creates a process with neither capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `run` capability.
    #[must_use]
    pub fn with_run<F, Fut>(mut self, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.run = Some(Box::new(move || Box::pin(run()) as BoxFuture));
        self
    }

    /// Sets the `interrupt` capability.
    #[must_use]
    pub fn with_interrupt<F, Fut>(mut self, interrupt: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.interrupt = Some(Box::new(move || Box::pin(interrupt()) as BoxFuture));
        self
    }

    /// Returns `true` when both `run` and `interrupt` are set.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.run.is_some() && self.interrupt.is_some()
    }

    /// Splits a valid process into its two capabilities.
    pub(crate) fn into_parts(self) -> Option<(RunFn, InterruptFn)> {
        match (self.run, self.interrupt) {
            (Some(run), Some(interrupt)) => Some((run, interrupt)),
            _ => None,
        }
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("run", &self.run.is_some())
            .field("interrupt", &self.interrupt.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_process_is_invalid() {
        assert!(!Process::new().is_valid());
    }

    #[test]
    fn process_without_interrupt_is_invalid() {
        let process = Process::new().with_run(|| async { Ok(()) });
        assert!(!process.is_valid());
        assert!(process.into_parts().is_none());
    }

    #[test]
    fn process_without_run_is_invalid() {
        let process = Process::new().with_interrupt(|| async { Ok(()) });
        assert!(!process.is_valid());
        assert!(process.into_parts().is_none());
    }

    #[test]
    fn complete_process_is_valid() {
        let process = Process::new()
            .with_run(|| async { Ok(()) })
            .with_interrupt(|| async { Ok(()) });
        assert!(process.is_valid());
        assert!(process.into_parts().is_some());
    }

    #[test]
    fn debug_reports_present_capabilities() {
        let process = Process::new().with_run(|| async { Ok(()) });
        assert_eq!(
            format!("{process:?}"),
            "Process { run: true, interrupt: false }"
        );
    }

    #[tokio::test]
    async fn capabilities_run_the_supplied_closures() {
        let process = Process::new()
            .with_run(|| async { Err(anyhow::anyhow!("from run")) })
            .with_interrupt(|| async { Ok(()) });
        let (run, interrupt) = process.into_parts().expect("valid process");

        assert_eq!(run().await.unwrap_err().to_string(), "from run");
        assert!(interrupt().await.is_ok());
    }
}
