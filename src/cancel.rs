//! Cooperative cancellation shared by every component of one analysis run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Something blocked on a condition that should wake up when the run is cancelled.
pub trait CancelListener: Send + Sync {
    fn cancelled(&self);
}

/// Once set, a token stays cancelled. Listeners are held weakly so a finished
/// wait never keeps its record alive.
#[derive(Default)]
pub struct CancellationToken {
    flag: AtomicBool,
    listeners: Mutex<Vec<Weak<dyn CancelListener>>>,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Signal cancellation and wake every registered listener.
    pub fn cancel(&self) {
        if self.flag.swap(true, Ordering::AcqRel) {
            return;
        }
        let listeners = {
            let mut guard = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        tracing::debug!(
            target: "loader",
            stage = "cancel",
            listeners = listeners.len(),
            "analysis cancelled"
        );
        for listener in listeners.iter().filter_map(Weak::upgrade) {
            listener.cancelled();
        }
    }

    /// Register a listener. If the token is already cancelled the listener is
    /// notified immediately.
    pub fn register(&self, listener: &Arc<dyn CancelListener>) {
        {
            let mut guard = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.is_cancelled() {
                guard.retain(|existing| existing.strong_count() > 0);
                guard.push(Arc::downgrade(listener));
                return;
            }
        }
        listener.cancelled();
    }
}
