//! Activity-driven timer that keeps the background worker from idling out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// A resettable one-shot timer.
///
/// Every [`reset`](Self::reset) cancels the pending tick and arms a new
/// one. The host may still suspend the worker; this is best-effort.
pub struct KeepAlive {
    period: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
    ticks: Arc<AtomicU64>,
}

impl KeepAlive {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            timer: Mutex::new(None),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Re-arms the timer. Must be called inside a tokio runtime.
    pub fn reset(&self) {
        let ticks = self.ticks.clone();
        let period = self.period;
        let next = tokio::spawn(async move {
            tokio::time::sleep(period).await;
            ticks.fetch_add(1, Ordering::Relaxed);
            debug!("Keeping service worker alive");
        });
        let previous = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(next);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// How many times the timer has fired.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        if let Some(timer) = self
            .timer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.abort();
        }
    }
}
