//! In-memory backend.

use super::{Entries, Quota, StorageBackend};
use crate::change::ChangeSet;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Keeps a partition in memory. Used for the sync partition and in tests.
///
/// The backend can be switched offline to exercise failure handling of
/// callers; while offline every operation fails with
/// [`StorageError::Unavailable`].
pub struct MemoryBackend {
    quota: Quota,
    entries: RwLock<Entries>,
    online: AtomicBool,
}

impl MemoryBackend {
    /// Creates an empty backend with the given limits.
    pub fn new(quota: Quota) -> Self {
        Self {
            quota,
            entries: RwLock::new(Entries::default()),
            online: AtomicBool::new(true),
        }
    }

    /// An uncapped backend, like the device-local partition.
    pub fn unbounded() -> Self {
        Self::new(Quota::unbounded())
    }

    /// A backend with the sync partition's quota.
    pub fn with_sync_quota() -> Self {
        Self::new(Quota::sync())
    }

    /// Simulates the backend becoming unreachable (or reachable again).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> StorageResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory backend is offline".into()))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn quota_bytes(&self) -> Option<u64> {
        self.quota.total
    }

    async fn get(&self, keys: Option<&[String]>) -> StorageResult<Map<String, Value>> {
        self.ensure_online()?;
        Ok(self.entries.read().await.select(keys))
    }

    async fn set(&self, items: Map<String, Value>) -> StorageResult<ChangeSet> {
        self.ensure_online()?;
        self.entries.write().await.set(items, self.quota)
    }

    async fn remove(&self, keys: &[String]) -> StorageResult<ChangeSet> {
        self.ensure_online()?;
        Ok(self.entries.write().await.remove(keys))
    }

    async fn clear(&self) -> StorageResult<ChangeSet> {
        self.ensure_online()?;
        Ok(self.entries.write().await.clear())
    }

    async fn bytes_in_use(&self, keys: Option<&[String]>) -> StorageResult<u64> {
        self.ensure_online()?;
        self.entries.read().await.bytes(keys)
    }
}
