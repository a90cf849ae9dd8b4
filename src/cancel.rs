//! Cooperative cancellation for long-running sweeps.
//!
//! A [`CancelToken`] is checked at every suspension point of a run; pacing
//! sleeps wake early when it fires. Dropping the [`CancelHandle`] without
//! cancelling leaves the token un-cancelled forever.

use std::time::Duration;
use tokio::sync::watch;

/// The firing side of a cancellation pair. Held by whoever watches for the
/// interrupt (Ctrl-C in the binary).
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Fire the token. Idempotent; every clone of the token observes it.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// The observing side of a cancellation pair. Cheap to clone; each long-running
/// component keeps its own copy.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// A connected handle/token pair.
///
/// # Returns
///
/// `(handle, token)`: calling [`CancelHandle::cancel`] makes
/// [`CancelToken::is_cancelled`] return `true` and wakes any pending
/// [`CancelToken::sleep`].
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelToken {
    /// A token that never fires.
    pub fn never() -> Self {
        let (_handle, token) = cancel_pair();
        token
    }

    /// Whether the paired handle has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled; pends forever if the handle is gone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// # Arguments
    ///
    /// * `duration` - The pacing delay to wait out
    ///
    /// # Returns
    ///
    /// `true` if the full delay elapsed, `false` if the token was cancelled
    /// before or during the wait.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}
