//! The debounced significance detector.

use crate::mutation::MutationBatch;
use crate::observer::{ChangeObserver, ObserveOptions, ObserveTarget, Observation};
use crate::significance::{DEFAULT_SIGNIFICANT_TAGS, SignificanceFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Configuration for the mutation detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Quiet period after the last batch before it is evaluated (ms).
    pub debounce_ms: u64,
    /// An added container must have more children than this.
    pub significance_threshold: usize,
    /// Container tags, lowercase.
    pub significant_tags: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            significance_threshold: 5,
            significant_tags: DEFAULT_SIGNIFICANT_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl DetectorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn filter(&self) -> SignificanceFilter {
        SignificanceFilter::new(self.significance_threshold, self.significant_tags.iter().cloned())
    }
}

struct Session {
    target: ObserveTarget,
    observation: Box<dyn Observation>,
    worker: JoinHandle<()>,
}

/// Watches one subtree and calls back on significant bursts of additions.
///
/// At most one native observation is live per detector: calling
/// [`start`](Self::start) while a session is active stops that session
/// first. Dropping the detector stops it. `start` spawns onto the current
/// tokio runtime.
pub struct MutationDetector {
    observer: Arc<dyn ChangeObserver>,
    config: DetectorConfig,
    session: Option<Session>,
}

impl MutationDetector {
    pub fn new(observer: Arc<dyn ChangeObserver>, config: DetectorConfig) -> Self {
        Self {
            observer,
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Whether a session is active.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Target of the active session.
    pub fn target(&self) -> Option<&ObserveTarget> {
        self.session.as_ref().map(|s| &s.target)
    }

    /// Begins observing `target` for subtree-wide child-list changes.
    ///
    /// `callback` runs on the detector's worker task with no arguments each
    /// time a debounced batch is significant. A panicking callback ends the
    /// session's worker; it is not caught.
    pub fn start<F>(&mut self, callback: F, target: ObserveTarget)
    where
        F: FnMut() + Send + 'static,
    {
        if self.session.is_some() {
            debug!("Mutation detector restarted; stopping previous session");
            self.stop();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let observation = self
            .observer
            .observe(&target, ObserveOptions::SUBTREE_CHILD_LIST, tx);
        let worker = tokio::spawn(debounce_loop(
            rx,
            self.config.debounce(),
            self.config.filter(),
            callback,
        ));

        debug!("Mutation detector observing {:?}", target);
        self.session = Some(Session {
            target,
            observation,
            worker,
        });
    }

    /// Disconnects the observation and cancels any pending evaluation.
    /// No-op when not started.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.observation.disconnect();
            session.worker.abort();
            debug!("Mutation detector stopped");
        }
    }
}

impl Drop for MutationDetector {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn debounce_loop<F>(
    mut batches: mpsc::UnboundedReceiver<MutationBatch>,
    delay: Duration,
    filter: SignificanceFilter,
    mut callback: F,
) where
    F: FnMut(),
{
    while let Some(mut latest) = batches.recv().await {
        // Each new batch re-arms the timer and replaces the one under evaluation.
        loop {
            tokio::select! {
                next = batches.recv() => match next {
                    Some(batch) => latest = batch,
                    None => return,
                },
                () = tokio::time::sleep(delay) => break,
            }
        }

        if filter.is_significant(&latest) {
            debug!("Significant DOM change detected");
            callback();
        }
    }
}
