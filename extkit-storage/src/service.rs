//! Best-effort storage adapter used by every context.
//!
//! No method here returns an error. A failed read yields `None` (or an empty
//! map), a failed write yields `false`, and the failure is logged. Callers
//! that care whether a write persisted must check the returned flag.

use crate::area::ExtensionStorage;
use crate::change::{ChangeEvent, ChangeSet};
use crate::partition::Partition;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Usage of the sync partition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaInfo {
    pub quota: u64,
    pub bytes_in_use: u64,
    pub percent_used: f64,
}

/// Uniform get/set/remove/clear over both partitions.
#[derive(Clone)]
pub struct StorageService {
    storage: ExtensionStorage,
}

impl StorageService {
    pub fn new(storage: ExtensionStorage) -> Self {
        Self { storage }
    }

    /// The shared storage this adapter wraps.
    pub fn storage(&self) -> &ExtensionStorage {
        &self.storage
    }

    /// Reads `key`. Absent keys, stored `null`, values of another shape and
    /// backend failures all yield `None`.
    pub async fn get_item<T: DeserializeOwned>(&self, key: &str, partition: Partition) -> Option<T> {
        let keys = [key.to_string()];
        let mut items = match self.storage.get(partition, Some(&keys)).await {
            Ok(items) => items,
            Err(e) => {
                error!("StorageService: Failed to get item {}: {}", key, e);
                return None;
            }
        };
        match items.remove(key) {
            None | Some(Value::Null) => None,
            Some(value) => match serde_json::from_value(value) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!("StorageService: Item {} has unexpected shape: {}", key, e);
                    None
                }
            },
        }
    }

    /// Writes `key`. Returns false on any failure.
    pub async fn set_item<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        partition: Partition,
    ) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                error!("StorageService: Failed to encode item {}: {}", key, e);
                return false;
            }
        };
        let mut items = Map::new();
        items.insert(key.to_string(), value);
        match self.storage.set(partition, items).await {
            Ok(()) => true,
            Err(e) => {
                error!("StorageService: Failed to set item {}: {}", key, e);
                false
            }
        }
    }

    /// Removes `key`. Removing an absent key succeeds.
    pub async fn remove_item(&self, key: &str, partition: Partition) -> bool {
        match self.storage.remove(partition, &[key.to_string()]).await {
            Ok(()) => true,
            Err(e) => {
                error!("StorageService: Failed to remove item {}: {}", key, e);
                false
            }
        }
    }

    /// Reads several keys at once. Absent keys are missing from the map.
    pub async fn get_items(&self, keys: &[String], partition: Partition) -> Map<String, Value> {
        self.storage
            .get(partition, Some(keys))
            .await
            .unwrap_or_else(|e| {
                error!("StorageService: Failed to get items {:?}: {}", keys, e);
                Map::new()
            })
    }

    /// Writes several keys at once; all or nothing.
    pub async fn set_items(&self, items: Map<String, Value>, partition: Partition) -> bool {
        let count = items.len();
        match self.storage.set(partition, items).await {
            Ok(()) => true,
            Err(e) => {
                error!("StorageService: Failed to set {} items: {}", count, e);
                false
            }
        }
    }

    /// Removes every key in the partition.
    pub async fn clear(&self, partition: Partition) -> bool {
        match self.storage.clear(partition).await {
            Ok(()) => true,
            Err(e) => {
                error!("StorageService: Failed to clear {} storage: {}", partition, e);
                false
            }
        }
    }

    /// Every entry in the partition.
    pub async fn get_all_items(&self, partition: Partition) -> Map<String, Value> {
        self.storage
            .get(partition, None)
            .await
            .unwrap_or_else(|e| {
                error!("StorageService: Failed to get all items: {}", e);
                Map::new()
            })
    }

    /// Bytes used by the partition, 0 on failure.
    pub async fn get_bytes_in_use(&self, partition: Partition) -> u64 {
        self.storage
            .bytes_in_use(partition, None)
            .await
            .unwrap_or_else(|e| {
                error!("StorageService: Failed to get bytes in use: {}", e);
                0
            })
    }

    /// Reads `key`, falling back to `default` when it is absent or `null`.
    /// Falsy values (`false`, `0`, `""`) are returned as stored.
    pub async fn get_with_default<T: DeserializeOwned>(
        &self,
        key: &str,
        default: T,
        partition: Partition,
    ) -> T {
        self.get_item(key, partition).await.unwrap_or(default)
    }

    /// True if `key` holds a non-null value.
    pub async fn has_item(&self, key: &str, partition: Partition) -> bool {
        self.get_item::<Value>(key, partition).await.is_some()
    }

    /// Quota usage of the sync partition. Zeros when the partition reports
    /// no quota.
    pub async fn get_quota_info(&self) -> QuotaInfo {
        let quota = match self.storage.quota_bytes(Partition::Sync) {
            Some(quota) if quota > 0 => quota,
            _ => {
                error!("StorageService: Failed to get quota info: sync partition has no quota");
                return QuotaInfo::default();
            }
        };
        let bytes_in_use = self.get_bytes_in_use(Partition::Sync).await;
        QuotaInfo {
            quota,
            bytes_in_use,
            percent_used: bytes_in_use as f64 / quota as f64 * 100.0,
        }
    }

    /// Pull-style subscription to one partition's changes.
    pub fn subscribe(&self, partition: Partition) -> PartitionChanges {
        PartitionChanges {
            partition,
            rx: self.storage.subscribe(),
        }
    }

    /// Calls `callback` for every change set applied to `partition`.
    ///
    /// Runs on a spawned task until the storage is dropped or the returned
    /// handle is aborted.
    pub fn on_changed<F>(&self, partition: Partition, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(ChangeSet) + Send + 'static,
    {
        let mut changes = self.subscribe(partition);
        tokio::spawn(async move {
            while let Some(set) = changes.recv().await {
                callback(set);
            }
        })
    }
}

/// Change stream filtered to a single partition.
pub struct PartitionChanges {
    partition: Partition,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl PartitionChanges {
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Next change set for this partition, or `None` once the storage is
    /// gone. Falling behind skips the missed events.
    pub async fn recv(&mut self) -> Option<ChangeSet> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.partition == self.partition => return Some(event.changes),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Storage change listener lagged, {} events skipped", missed);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
