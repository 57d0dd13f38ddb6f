//! The pair of partitions shared by every context.

use crate::backend::{MemoryBackend, StorageBackend};
use crate::change::{ChangeEvent, ChangeSet};
use crate::error::StorageResult;
use crate::partition::Partition;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Device-local and sync-replicated backends plus the change stream.
///
/// Cloning is cheap; clones share the same backends and stream. Operations
/// return raw backend errors. Contexts should go through
/// [`StorageService`](crate::StorageService) instead.
#[derive(Clone)]
pub struct ExtensionStorage {
    local: Arc<dyn StorageBackend>,
    sync: Arc<dyn StorageBackend>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl ExtensionStorage {
    pub fn new(local: Arc<dyn StorageBackend>, sync: Arc<dyn StorageBackend>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            local,
            sync,
            changes,
        }
    }

    /// Both partitions in memory; the sync partition carries its quota.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryBackend::unbounded()),
            Arc::new(MemoryBackend::with_sync_quota()),
        )
    }

    /// The backend holding `partition`.
    pub fn backend(&self, partition: Partition) -> &Arc<dyn StorageBackend> {
        match partition {
            Partition::Local => &self.local,
            Partition::Sync => &self.sync,
        }
    }

    /// Subscribes to changes in both partitions.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    pub async fn get(
        &self,
        partition: Partition,
        keys: Option<&[String]>,
    ) -> StorageResult<Map<String, Value>> {
        self.backend(partition).get(keys).await
    }

    pub async fn set(&self, partition: Partition, items: Map<String, Value>) -> StorageResult<()> {
        let changes = self.backend(partition).set(items).await?;
        self.publish(partition, changes);
        Ok(())
    }

    pub async fn remove(&self, partition: Partition, keys: &[String]) -> StorageResult<()> {
        let changes = self.backend(partition).remove(keys).await?;
        self.publish(partition, changes);
        Ok(())
    }

    pub async fn clear(&self, partition: Partition) -> StorageResult<()> {
        let changes = self.backend(partition).clear().await?;
        self.publish(partition, changes);
        Ok(())
    }

    pub async fn bytes_in_use(
        &self,
        partition: Partition,
        keys: Option<&[String]>,
    ) -> StorageResult<u64> {
        self.backend(partition).bytes_in_use(keys).await
    }

    pub fn quota_bytes(&self, partition: Partition) -> Option<u64> {
        self.backend(partition).quota_bytes()
    }

    fn publish(&self, partition: Partition, changes: ChangeSet) {
        if changes.is_empty() {
            return;
        }
        debug!("{} storage changed: {} keys", partition, changes.len());
        // No subscribers is fine.
        let _ = self.changes.send(ChangeEvent { partition, changes });
    }
}
