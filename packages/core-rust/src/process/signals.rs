//! OS shutdown signals and their subscription.
//!
//! The set of recognized signals is a plain value handed to the coordinator,
//! not process-wide state. Subscribing registers the OS streams immediately
//! (so a signal arriving right after `subscribe` returns is not missed) and
//! spawns a listener that cancels a token on the first delivery.

use std::future::Future;
use std::pin::Pin;

use futures_util::future::select_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A termination signal the lifecycle can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownSignal {
    /// `SIGINT` on unix, Ctrl-C on Windows.
    Interrupt,
    /// `SIGTERM`. Unix only.
    Terminate,
    /// `SIGHUP`. Unix only.
    Hangup,
    /// `SIGQUIT`. Unix only.
    Quit,
}

impl ShutdownSignal {
    /// Conventional name of the signal.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Hangup => "SIGHUP",
            Self::Quit => "SIGQUIT",
        }
    }

    #[cfg(unix)]
    fn kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Self::Interrupt => SignalKind::interrupt(),
            Self::Terminate => SignalKind::terminate(),
            Self::Hangup => SignalKind::hangup(),
            Self::Quit => SignalKind::quit(),
        }
    }
}

/// The set of signals that interrupt a lifecycle.
///
/// Defaults to [`ShutdownSignal::Interrupt`] alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownSignals {
    signals: Vec<ShutdownSignal>,
}

impl Default for ShutdownSignals {
    fn default() -> Self {
        Self {
            signals: vec![ShutdownSignal::Interrupt],
        }
    }
}

type SignalWaiter = Pin<Box<dyn Future<Output = ShutdownSignal> + Send>>;

impl ShutdownSignals {
    /// Builds a set from the given signals, ignoring duplicates.
    #[must_use]
    pub fn new(signals: impl IntoIterator<Item = ShutdownSignal>) -> Self {
        signals.into_iter().fold(Self::none(), Self::with)
    }

    /// An empty set: only cancellation of the context stops the lifecycle.
    #[must_use]
    pub fn none() -> Self {
        Self {
            signals: Vec::new(),
        }
    }

    /// Adds a signal to the set.
    #[must_use]
    pub fn with(mut self, signal: ShutdownSignal) -> Self {
        if !self.signals.contains(&signal) {
            self.signals.push(signal);
        }
        self
    }

    /// Signals in registration order.
    #[must_use]
    pub fn signals(&self) -> &[ShutdownSignal] {
        &self.signals
    }

    /// Registers every signal of the set and spawns a listener that cancels
    /// `token` when one of them is delivered.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while registering a signal stream.
    pub fn subscribe(&self, token: CancellationToken) -> std::io::Result<SignalSubscription> {
        let waiters = self.register()?;
        if waiters.is_empty() {
            return Ok(SignalSubscription { listener: None });
        }

        let listener = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                (signal, _, _) = select_all(waiters) => {
                    debug!(signal = signal.as_str(), "received shutdown signal");
                    token.cancel();
                }
            }
        });

        Ok(SignalSubscription {
            listener: Some(listener),
        })
    }

    #[cfg(unix)]
    fn register(&self) -> std::io::Result<Vec<SignalWaiter>> {
        let mut waiters: Vec<SignalWaiter> = Vec::with_capacity(self.signals.len());
        for &signal in &self.signals {
            let mut stream = tokio::signal::unix::signal(signal.kind())?;
            waiters.push(Box::pin(async move {
                if stream.recv().await.is_none() {
                    // The signal driver went away; this stream never fires.
                    std::future::pending::<()>().await;
                }
                signal
            }));
        }
        Ok(waiters)
    }

    #[cfg(windows)]
    fn register(&self) -> std::io::Result<Vec<SignalWaiter>> {
        let mut waiters: Vec<SignalWaiter> = Vec::new();
        if self.signals.contains(&ShutdownSignal::Interrupt) {
            let mut stream = tokio::signal::windows::ctrl_c()?;
            waiters.push(Box::pin(async move {
                if stream.recv().await.is_none() {
                    std::future::pending::<()>().await;
                }
                ShutdownSignal::Interrupt
            }));
        }
        Ok(waiters)
    }

    #[cfg(not(any(unix, windows)))]
    fn register(&self) -> std::io::Result<Vec<SignalWaiter>> {
        Ok(Vec::new())
    }
}

/// Live registration of a signal listener.
///
/// Dropping the subscription aborts the listener; [`release`](Self::release)
/// additionally waits for it to be gone.
///
/// Releasing does not give the signal back to the OS. Tokio installs its
/// handler for a signal kind on first registration and keeps it for the rest
/// of the process, so once a lifecycle has subscribed to `SIGINT`, later
/// deliveries with no active subscription are absorbed instead of
/// terminating the process.
#[derive(Debug)]
pub struct SignalSubscription {
    listener: Option<JoinHandle<()>>,
}

impl SignalSubscription {
    /// Returns `true` while the listener task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| !listener.is_finished())
    }

    /// Stops listening and waits for the listener task to finish.
    ///
    /// The process-wide tokio handler stays installed; see the type docs.
    pub async fn release(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            // Either cancelled by the abort or already done; both are fine.
            let _ = listener.await;
        }
    }
}

impl Drop for SignalSubscription {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_is_interrupt_only() {
        assert_eq!(
            ShutdownSignals::default().signals(),
            &[ShutdownSignal::Interrupt]
        );
    }

    #[test]
    fn new_ignores_duplicates() {
        let signals = ShutdownSignals::new([
            ShutdownSignal::Terminate,
            ShutdownSignal::Interrupt,
            ShutdownSignal::Terminate,
        ]);
        assert_eq!(
            signals.signals(),
            &[ShutdownSignal::Terminate, ShutdownSignal::Interrupt]
        );
    }

    #[test]
    fn signal_names() {
        assert_eq!(ShutdownSignal::Interrupt.as_str(), "SIGINT");
        assert_eq!(ShutdownSignal::Terminate.as_str(), "SIGTERM");
        assert_eq!(ShutdownSignal::Hangup.as_str(), "SIGHUP");
        assert_eq!(ShutdownSignal::Quit.as_str(), "SIGQUIT");
    }

    #[tokio::test]
    async fn empty_set_has_no_listener() {
        let subscription = ShutdownSignals::none()
            .subscribe(CancellationToken::new())
            .expect("nothing to register");
        assert!(!subscription.is_active());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn release_stops_the_listener() {
        let token = CancellationToken::new();
        let mut subscription = ShutdownSignals::default()
            .subscribe(token.clone())
            .expect("SIGINT registration");
        assert!(subscription.is_active());

        subscription.release().await;

        assert!(!subscription.is_active());
        assert!(!token.is_cancelled());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn listener_exits_once_token_is_cancelled() {
        let token = CancellationToken::new();
        let subscription = ShutdownSignals::default()
            .subscribe(token.clone())
            .expect("SIGINT registration");

        token.cancel();
        for _ in 0..50 {
            if !subscription.is_active() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(!subscription.is_active());
    }
}
