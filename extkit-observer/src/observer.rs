//! Host capability for DOM-change notifications.
//!
//! In a browser this wraps the native mutation observer. Tests and the
//! simulator use [`mock::ManualObserver`], which delivers whatever batches
//! the caller emits.

use crate::mutation::MutationBatch;
use tokio::sync::mpsc;

/// Channel through which an observation delivers its batches.
pub type BatchSender = mpsc::UnboundedSender<MutationBatch>;

/// Root of the observed subtree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ObserveTarget {
    /// The document body.
    #[default]
    DocumentBody,
    /// The first element matching a CSS selector.
    Selector(String),
}

/// What to observe under the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Report child additions and removals.
    pub child_list: bool,
    /// Include the whole subtree, not only direct children.
    pub subtree: bool,
}

impl ObserveOptions {
    /// Child-list changes anywhere in the subtree.
    pub const SUBTREE_CHILD_LIST: ObserveOptions = ObserveOptions {
        child_list: true,
        subtree: true,
    };
}

/// A live native observation. Must be disconnected explicitly.
pub trait Observation: Send {
    /// Stops delivery. Calling it twice is harmless.
    fn disconnect(&mut self);
}

/// Registers native observations.
pub trait ChangeObserver: Send + Sync {
    /// Starts observing `target`; every notification is sent to `sink`.
    fn observe(
        &self,
        target: &ObserveTarget,
        options: ObserveOptions,
        sink: BatchSender,
    ) -> Box<dyn Observation>;
}

/// A hand-driven observer for testing.
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Registry {
        next_id: u64,
        live: BTreeMap<u64, (ObserveTarget, ObserveOptions, BatchSender)>,
    }

    /// Observer whose notifications are emitted by the test.
    #[derive(Clone, Default)]
    pub struct ManualObserver {
        registry: Arc<Mutex<Registry>>,
    }

    impl ManualObserver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Delivers `batch` to every live observation. Returns how many
        /// observations received it.
        pub fn emit(&self, batch: MutationBatch) -> usize {
            let registry = self.registry.lock().unwrap();
            registry
                .live
                .values()
                .filter(|(_, _, sink)| sink.send(batch.clone()).is_ok())
                .count()
        }

        /// Number of observations not yet disconnected.
        pub fn live_count(&self) -> usize {
            self.registry.lock().unwrap().live.len()
        }

        /// Targets of the live observations, oldest first.
        pub fn live_targets(&self) -> Vec<ObserveTarget> {
            self.registry
                .lock()
                .unwrap()
                .live
                .values()
                .map(|(target, _, _)| target.clone())
                .collect()
        }

        /// Options of the most recent live observation.
        pub fn last_options(&self) -> Option<ObserveOptions> {
            self.registry
                .lock()
                .unwrap()
                .live
                .values()
                .next_back()
                .map(|(_, options, _)| *options)
        }
    }

    impl ChangeObserver for ManualObserver {
        fn observe(
            &self,
            target: &ObserveTarget,
            options: ObserveOptions,
            sink: BatchSender,
        ) -> Box<dyn Observation> {
            let mut registry = self.registry.lock().unwrap();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.live.insert(id, (target.clone(), options, sink));
            Box::new(ManualObservation {
                id,
                registry: self.registry.clone(),
            })
        }
    }

    struct ManualObservation {
        id: u64,
        registry: Arc<Mutex<Registry>>,
    }

    impl Observation for ManualObservation {
        fn disconnect(&mut self) {
            if let Ok(mut registry) = self.registry.lock() {
                registry.live.remove(&self.id);
            }
        }
    }
}
