//! DOM-change observation for content contexts.
//!
//! Pages built by client-side frameworks keep adding content after load.
//! The [`MutationDetector`] watches a subtree through the host's
//! [`ChangeObserver`] capability, collapses bursts of notifications, and
//! calls back only when a burst added a sizeable container element, so the
//! content script knows when to re-apply its page adaptations.
//!
//! ## Debounce policy
//!
//! Trailing and batch-replacing: every batch cancels the pending timer and
//! re-arms it, and when the timer finally fires only the *last* batch is
//! evaluated. Earlier batches of a burst are dropped, not merged.

mod detector;
mod mutation;
pub mod observer;
mod significance;

pub use detector::{DetectorConfig, MutationDetector};
pub use mutation::{AddedNode, MutationBatch, MutationKind, MutationRecord};
pub use observer::{BatchSender, ChangeObserver, ObserveOptions, ObserveTarget, Observation};
pub use significance::{DEFAULT_SIGNIFICANT_TAGS, SignificanceFilter};
