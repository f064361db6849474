//! Panic containment for fallible actions.
//!
//! This is the only place in the crate where a panic is turned into an error
//! value. Three entry points share one conversion:
//!
//! - [`safe_run_sync`] runs a closure in the calling thread.
//! - [`safe_run`] awaits a future in the calling task.
//! - [`safe_run_async`] spawns the future and hands back a single-slot channel
//!   that receives the result exactly once.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures_util::FutureExt;
use tokio::sync::oneshot;

use super::error::ProcessError;

/// Payload carried by an unwinding panic.
pub type PanicPayload = Box<dyn Any + Send + 'static>;

/// Message used when a panic payload has no textual form we can recover.
const OPAQUE_PAYLOAD: &str = "panicked with a non-displayable payload";

/// Runs `action` once in the calling thread, converting a panic into an error.
///
/// # Errors
///
/// Returns the action's own error unchanged, or the error reconstructed from
/// the panic payload (see [`error_from_panic`]).
pub fn safe_run_sync<F>(action: F) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(action)) {
        Ok(result) => result,
        Err(payload) => Err(error_from_panic(payload)),
    }
}

/// Awaits `future` in the current task, converting a panic raised while
/// polling it into an error.
///
/// # Errors
///
/// Same contract as [`safe_run_sync`].
pub async fn safe_run<F>(future: F) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(error_from_panic(payload)),
    }
}

/// Spawns `future` on its own tokio task and returns immediately.
///
/// The returned receiver gets exactly one value: the future's result, or the
/// error reconstructed from its panic. Must be called from within a tokio
/// runtime.
pub fn safe_run_async<F>(future: F) -> oneshot::Receiver<anyhow::Result<()>>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let result = safe_run(future).await;
        if let Err(ref err) = result {
            tracing::debug!(error = %err, "safely run task finished with error");
        }
        // Nobody may be listening anymore; the result is simply dropped then.
        let _ = tx.send(result);
    });

    rx
}

/// Rebuilds an error from a panic payload.
///
/// Error-shaped payloads (`anyhow::Error`, [`ProcessError`], boxed std errors)
/// are returned as the error itself so callers can still downcast them. Any
/// other payload becomes [`ProcessError::Panicked`] carrying its text.
#[must_use]
pub fn error_from_panic(payload: PanicPayload) -> anyhow::Error {
    let payload = match payload.downcast::<anyhow::Error>() {
        Ok(err) => return *err,
        Err(other) => other,
    };
    let payload = match payload.downcast::<ProcessError>() {
        Ok(err) => return anyhow::Error::new(*err),
        Err(other) => other,
    };
    let payload = match payload.downcast::<Box<dyn std::error::Error + Send + Sync>>() {
        Ok(err) => return anyhow::anyhow!(*err),
        Err(other) => other,
    };

    ProcessError::Panicked {
        message: panic_message(payload.as_ref()),
    }
    .into()
}

/// Extracts the textual form of a non-error panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }

    macro_rules! display_scalar {
        ($($ty:ty),+ $(,)?) => {
            $(
                if let Some(value) = payload.downcast_ref::<$ty>() {
                    return value.to_string();
                }
            )+
        };
    }

    display_scalar!(
        i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    );

    OPAQUE_PAYLOAD.to_string()
}
