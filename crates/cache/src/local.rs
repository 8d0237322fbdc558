//! On-device key/value storage for the last known rewards profile.
//!
//! `FileStore` keeps one JSON document per key under a directory and is what
//! the app runs with. `MemoryStore` is backed by DashMap and serves tests and
//! ephemeral sessions.

use async_trait::async_trait;
use dashmap::DashMap;
use rewards_core::{RewardsError, RewardsResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Persistent string storage keyed by record name.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> RewardsResult<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> RewardsResult<()>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> RewardsResult<()>;
}

// ─── Memory ─────────────────────────────────────────────────────────────────

#[derive(Default, Clone)]
pub struct MemoryStore {
    store: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> RewardsResult<Option<String>> {
        Ok(self.store.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: &str) -> RewardsResult<()> {
        self.store.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> RewardsResult<()> {
        self.store.remove(key);
        Ok(())
    }
}

// ─── File ───────────────────────────────────────────────────────────────────

/// One `<key>.json` file per record. Writes go through a temp file and a
/// rename so a crash never leaves a half-written record behind.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> RewardsResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(RewardsError::Storage(format!("invalid cache key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> RewardsResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RewardsError::Storage(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn put(&self, key: &str, value: &str) -> RewardsResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| RewardsError::Storage(format!("create {}: {e}", self.dir.display())))?;
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| RewardsError::Storage(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| RewardsError::Storage(format!("rename {}: {e}", path.display())))?;

        debug!(key = key, bytes = value.len(), "Cache record written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> RewardsResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RewardsError::Storage(format!(
                "remove {}: {e}",
                path.display()
            ))),
        }
    }
}
