//! File-backed backend.
//!
//! Persists a partition as a single JSON document. The file is read on
//! first use and rewritten after every mutation through a temporary file
//! and a rename, so a crash never leaves a half-written document.

use super::{Entries, Quota, StorageBackend};
use crate::change::ChangeSet;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

/// File backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBackendConfig {
    /// Directory holding the partition file.
    pub dir: PathBuf,
    /// File name inside `dir`.
    pub file_name: String,
    /// Size limits.
    #[serde(default)]
    pub quota: Quota,
}

impl FileBackendConfig {
    /// Device-local partition stored in `dir/local.json`, uncapped.
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_name: "local.json".to_string(),
            quota: Quota::unbounded(),
        }
    }

    /// Sync partition stored in `dir/sync.json`, with the sync quota.
    pub fn sync(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_name: "sync.json".to_string(),
            quota: Quota::sync(),
        }
    }

    /// Full path of the partition file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// Stores a partition in a JSON file.
pub struct FileBackend {
    config: FileBackendConfig,
    /// Loaded entries; `None` until first access.
    cache: RwLock<Option<Entries>>,
}

impl FileBackend {
    /// Creates a backend. Nothing is read until the first operation.
    pub fn new(config: FileBackendConfig) -> Self {
        Self {
            config,
            cache: RwLock::new(None),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> PathBuf {
        self.config.path()
    }

    async fn load(path: &Path) -> StorageResult<Entries> {
        match fs::read(path).await {
            Ok(bytes) => {
                let value: Value = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))?;
                match value {
                    Value::Object(map) => {
                        debug!("Loaded {} entries from {}", map.len(), path.display());
                        Ok(Entries::from_map(map))
                    }
                    _ => Err(StorageError::Corrupt(format!(
                        "{}: top-level value is not an object",
                        path.display()
                    ))),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, entries: &Entries) -> StorageResult<()> {
        fs::create_dir_all(&self.config.dir).await?;
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(entries.as_map())?;
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Runs `f` against the loaded entries and persists if anything changed.
    async fn mutate<F>(&self, f: F) -> StorageResult<ChangeSet>
    where
        F: FnOnce(&mut Entries) -> StorageResult<ChangeSet> + Send,
    {
        let mut guard = self.cache.write().await;
        let mut entries = match guard.take() {
            Some(entries) => entries,
            None => Self::load(&self.path()).await?,
        };
        let before = entries.clone();

        let result = f(&mut entries);
        let outcome = match result {
            Ok(changes) if changes.is_empty() => Ok(changes),
            Ok(changes) => match self.persist(&entries).await {
                Ok(()) => Ok(changes),
                Err(e) => {
                    entries = before;
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };
        *guard = Some(entries);
        outcome
    }

    async fn read<T>(&self, f: impl FnOnce(&Entries) -> T + Send) -> StorageResult<T> {
        {
            let guard = self.cache.read().await;
            if let Some(entries) = guard.as_ref() {
                return Ok(f(entries));
            }
        }
        let mut guard = self.cache.write().await;
        let entries = match guard.take() {
            Some(entries) => entries,
            None => Self::load(&self.path()).await?,
        };
        Ok(f(guard.insert(entries)))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn quota_bytes(&self) -> Option<u64> {
        self.config.quota.total
    }

    async fn get(&self, keys: Option<&[String]>) -> StorageResult<Map<String, Value>> {
        self.read(|entries| entries.select(keys)).await
    }

    async fn set(&self, items: Map<String, Value>) -> StorageResult<ChangeSet> {
        let quota = self.config.quota;
        self.mutate(move |entries| entries.set(items, quota)).await
    }

    async fn remove(&self, keys: &[String]) -> StorageResult<ChangeSet> {
        self.mutate(|entries| Ok(entries.remove(keys))).await
    }

    async fn clear(&self) -> StorageResult<ChangeSet> {
        self.mutate(|entries| Ok(entries.clear())).await
    }

    async fn bytes_in_use(&self, keys: Option<&[String]>) -> StorageResult<u64> {
        self.read(|entries| entries.bytes(keys)).await?
    }
}
