//! Key-value storage for the extension's two partitions.
//!
//! # Architecture
//!
//! - [`StorageBackend`] is the raw, fallible store for one partition
//!   (in-memory with optional quota, or a JSON file on disk)
//! - [`ExtensionStorage`] pairs a device-local and a sync-replicated backend
//!   and publishes a change event for every mutation; it is shared by all
//!   contexts, like the browser's storage object
//! - [`StorageService`] is what contexts call. It never returns an error:
//!   failures are logged and turned into `None`, `false` or an empty map
//!
//! Writes are last-writer-wins. There is no compare-and-set.

mod area;
pub mod backend;
mod change;
mod error;
mod partition;
mod service;

pub use area::ExtensionStorage;
pub use backend::{FileBackend, FileBackendConfig, MemoryBackend, Quota, StorageBackend};
pub use change::{ChangeEvent, ChangeSet, StorageChange};
pub use error::{StorageError, StorageResult};
pub use partition::Partition;
pub use service::{PartitionChanges, QuotaInfo, StorageService};
