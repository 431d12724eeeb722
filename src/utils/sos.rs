//! Signal-of-Stop: cooperative shutdown shared by the UI loop and the
//! transport's background tasks.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A cloneable stop flag. Cancelling any clone wakes every waiter.
#[derive(Debug, Default, Clone)]
pub struct SignalOfStop {
    internal: Arc<SharedState>,
}

#[derive(Debug, Default)]
struct SharedState {
    closing: AtomicBool,
    notify: Notify,
}

impl SignalOfStop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.internal.closing.store(true, Ordering::Release);
        self.internal.notify.notify_waiters();
    }

    pub fn cancelled(&self) -> bool {
        self.internal.closing.load(Ordering::Acquire)
    }

    /// Resolve once cancelled. Returns immediately if already cancelled.
    pub async fn wait(&self) {
        let notified = self.internal.notify.notified();
        if self.cancelled() {
            return;
        }
        notified.await;
    }

    /// Race `fut` against cancellation: `Err(())` if the stop came first.
    pub async fn select<F, T>(&self, fut: F) -> Result<T, ()>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::select! {
            res = fut => Ok(res),
            _ = self.wait() => Err(()),
        }
    }
}
