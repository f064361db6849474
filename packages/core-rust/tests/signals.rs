//! Drives lifecycles with a real `SIGINT` sent to the test process.
//!
//! Everything lives in one test so that no other lifecycle in this binary
//! observes the signals raised here.

#![cfg(unix)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::sync::Notify;
use toolkit_core::{
    start_runnable_with_signal_handler, start_with_signal_handler, CancellationToken, Process,
    Runnable,
};

fn raise_sigint_after(delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        kill(Pid::this(), Signal::SIGINT).expect("SIGINT should be deliverable to self");
    });
}

fn stoppable_process(interrupt_calls: Arc<AtomicU32>, interrupt_error: Option<&'static str>) -> Process {
    let stop = Arc::new(Notify::new());
    let stop_run = Arc::clone(&stop);

    Process::new()
        .with_run(move || async move {
            tokio::select! {
                () = stop_run.notified() => {}
                () = tokio::time::sleep(Duration::from_secs(5)) => {
                    anyhow::bail!("process reached timeout");
                }
            }
            Ok(())
        })
        .with_interrupt(move || async move {
            interrupt_calls.fetch_add(1, Ordering::SeqCst);
            stop.notify_one();
            match interrupt_error {
                Some(message) => Err(anyhow::anyhow!(message)),
                None => Ok(()),
            }
        })
}

struct FailingRunnable {
    stop: Notify,
    done: Notify,
    stop_calls: AtomicU32,
}

#[async_trait]
impl Runnable for FailingRunnable {
    async fn start(&self) -> anyhow::Result<()> {
        self.stop.notified().await;
        self.done.notify_one();
        anyhow::bail!("sample error")
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stop.notify_one();
        self.done.notified().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }
}

#[tokio::test]
async fn sigint_drives_the_lifecycle() {
    let ctx = CancellationToken::new();

    // SIGINT interrupts a blocked run exactly once.
    let first_calls = Arc::new(AtomicU32::new(0));
    let wait = start_with_signal_handler(&ctx, stoppable_process(Arc::clone(&first_calls), None))
        .expect("valid process");
    raise_sigint_after(Duration::from_millis(100));
    assert!(wait.wait().await.is_ok());
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);

    // The interrupt's error is what the lifecycle resolves to.
    let second_calls = Arc::new(AtomicU32::new(0));
    let wait = start_with_signal_handler(
        &ctx,
        stoppable_process(Arc::clone(&second_calls), Some("sample error")),
    )
    .expect("valid process");
    raise_sigint_after(Duration::from_millis(100));
    assert_eq!(wait.wait().await.unwrap_err().to_string(), "sample error");
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);

    // The first lifecycle released its subscription: it saw only its own signal.
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);

    // A runnable's run error wins over its clean stop.
    let runnable = Arc::new(FailingRunnable {
        stop: Notify::new(),
        done: Notify::new(),
        stop_calls: AtomicU32::new(0),
    });
    let wait = start_runnable_with_signal_handler(&ctx, Arc::clone(&runnable))
        .expect("runnable should start");
    raise_sigint_after(Duration::from_millis(100));
    assert_eq!(wait.wait().await.unwrap_err().to_string(), "sample error");
    assert_eq!(runnable.stop_calls.load(Ordering::SeqCst), 1);

    // A lifecycle that finished on its own is not woken by a later signal,
    // and a fresh lifecycle can claim SIGINT again.
    let finished_calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&finished_calls);
    let finished = Process::new()
        .with_run(|| async { Ok(()) })
        .with_interrupt(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    let wait = start_with_signal_handler(&ctx, finished).expect("valid process");
    assert!(wait.wait().await.is_ok());

    let fresh_calls = Arc::new(AtomicU32::new(0));
    let wait = start_with_signal_handler(&ctx, stoppable_process(Arc::clone(&fresh_calls), None))
        .expect("valid process");
    raise_sigint_after(Duration::from_millis(100));
    assert!(wait.wait().await.is_ok());
    assert_eq!(fresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(finished_calls.load(Ordering::SeqCst), 0);

    // With every subscription released, SIGINT is absorbed by the handler
    // tokio keeps installed: the process survives and nothing is cancelled.
    kill(Pid::this(), Signal::SIGINT).expect("SIGINT should be deliverable to self");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fresh_calls.load(Ordering::SeqCst), 1);

    assert!(!ctx.is_cancelled());
}
