//! Storage backend abstraction.
//!
//! A backend stores the entries of a single partition. Every mutation
//! returns the per-key changes it made so the caller can publish them.

mod file;
mod memory;

pub use file::{FileBackend, FileBackendConfig};
pub use memory::MemoryBackend;

use crate::change::{ChangeSet, StorageChange};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use extkit_types::constants::{SYNC_QUOTA_BYTES, SYNC_QUOTA_BYTES_PER_ITEM};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw key-value store for one partition.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns the name of the backend, for logs.
    fn name(&self) -> &'static str;

    /// Total byte quota, if the backend is capped.
    fn quota_bytes(&self) -> Option<u64>;

    /// Reads the given keys, or every entry when `keys` is `None`.
    /// Absent keys are simply missing from the result.
    async fn get(&self, keys: Option<&[String]>) -> StorageResult<Map<String, Value>>;

    /// Writes all items or none of them.
    async fn set(&self, items: Map<String, Value>) -> StorageResult<ChangeSet>;

    /// Removes the given keys. Keys that were absent produce no change.
    async fn remove(&self, keys: &[String]) -> StorageResult<ChangeSet>;

    /// Removes every entry.
    async fn clear(&self) -> StorageResult<ChangeSet>;

    /// Bytes used by the given keys, or by the whole partition.
    async fn bytes_in_use(&self, keys: Option<&[String]>) -> StorageResult<u64>;
}

/// Size limits of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Quota {
    /// Maximum bytes across all items.
    pub total: Option<u64>,
    /// Maximum bytes of a single item.
    pub per_item: Option<u64>,
}

impl Quota {
    /// No limits (device-local partition).
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            total: None,
            per_item: None,
        }
    }

    /// The sync-replicated partition's limits.
    #[must_use]
    pub const fn sync() -> Self {
        Self {
            total: Some(SYNC_QUOTA_BYTES),
            per_item: Some(SYNC_QUOTA_BYTES_PER_ITEM),
        }
    }
}

/// Bytes an item occupies: key length plus its JSON encoding.
pub fn item_bytes(key: &str, value: &Value) -> StorageResult<u64> {
    Ok((key.len() + serde_json::to_string(value)?.len()) as u64)
}

/// Entry map with quota-checked mutation, shared by the backends.
#[derive(Debug, Clone, Default)]
pub(crate) struct Entries {
    map: Map<String, Value>,
}

impl Entries {
    pub(crate) fn from_map(map: Map<String, Value>) -> Self {
        Self { map }
    }

    pub(crate) fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }

    pub(crate) fn select(&self, keys: Option<&[String]>) -> Map<String, Value> {
        match keys {
            None => self.map.clone(),
            Some(keys) => keys
                .iter()
                .filter_map(|k| self.map.get(k).map(|v| (k.clone(), v.clone())))
                .collect(),
        }
    }

    pub(crate) fn bytes(&self, keys: Option<&[String]>) -> StorageResult<u64> {
        self.select(keys)
            .iter()
            .map(|(k, v)| item_bytes(k, v))
            .sum()
    }

    /// Checks quota against the projected state, then commits.
    pub(crate) fn set(&mut self, items: Map<String, Value>, quota: Quota) -> StorageResult<ChangeSet> {
        if let Some(limit) = quota.per_item {
            for (key, value) in &items {
                let size = item_bytes(key, value)?;
                if size > limit {
                    return Err(StorageError::ItemTooLarge {
                        key: key.clone(),
                        size,
                        limit,
                    });
                }
            }
        }

        if let Some(total) = quota.total {
            let mut projected = self.map.clone();
            for (key, value) in &items {
                projected.insert(key.clone(), value.clone());
            }
            let needed = Entries::from_map(projected).bytes(None)?;
            if needed > total {
                return Err(StorageError::QuotaExceeded {
                    needed,
                    quota: total,
                });
            }
        }

        let mut changes = ChangeSet::new();
        for (key, value) in items {
            let old_value = self.map.insert(key.clone(), value.clone());
            changes.insert(
                key,
                StorageChange {
                    old_value,
                    new_value: Some(value),
                },
            );
        }
        Ok(changes)
    }

    pub(crate) fn remove(&mut self, keys: &[String]) -> ChangeSet {
        keys.iter()
            .filter_map(|key| {
                self.map.remove(key).map(|old| {
                    (
                        key.clone(),
                        StorageChange {
                            old_value: Some(old),
                            new_value: None,
                        },
                    )
                })
            })
            .collect()
    }

    pub(crate) fn clear(&mut self) -> ChangeSet {
        std::mem::take(&mut self.map)
            .into_iter()
            .map(|(key, old)| {
                (
                    key,
                    StorageChange {
                        old_value: Some(old),
                        new_value: None,
                    },
                )
            })
            .collect()
    }
}
