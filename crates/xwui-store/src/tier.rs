//! Storage tier backends.
//!
//! The small tier models cookie-class storage: tiny per-entry ceiling,
//! shipped everywhere. The large tier models general-purpose local storage.
//! Both speak the same trait so the store stays backend-agnostic.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Keyed string storage with read, write, and remove.
#[async_trait]
pub trait StorageTier: Send + Sync {
    /// Read the value stored under a key.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] when the backend fails; a missing key
    /// is `Ok(None)`.
    async fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value under a key, replacing any previous value.
    ///
    /// # Errors
    /// Returns [`StoreError::QuotaExceeded`] when the value does not fit the
    /// tier's per-entry ceiling, [`StoreError::Backend`] on backend failure.
    async fn write(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove the value stored under a key. Removing a missing key is fine.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] when the backend fails.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

/// In-memory tier with an optional per-entry byte ceiling.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: Mutex<HashMap<String, String>>,
    byte_limit: Option<usize>,
}

impl MemoryTier {
    /// Unlimited in-memory tier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory tier rejecting entries larger than `limit` bytes.
    #[must_use]
    pub fn with_byte_limit(limit: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            byte_limit: Some(limit),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StorageTier for MemoryTier {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        if let Some(limit) = self.byte_limit {
            if value.len() > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    size: value.len(),
                    limit,
                });
            }
        }
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Filesystem-backed tier storing one file per key.
#[derive(Debug, Clone)]
pub struct FileTier {
    dir: PathBuf,
}

impl FileTier {
    /// Tier storing entries as files under `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn backend_error(key: &str, err: &std::io::Error) -> StoreError {
        StoreError::Backend {
            key: key.to_string(),
            detail: err.to_string(),
        }
    }
}

#[async_trait]
impl StorageTier for FileTier {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::backend_error(key, &err)),
        }
    }

    async fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        if let Some(parent) = self.path_for(key).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| Self::backend_error(key, &err))?;
        }
        tokio::fs::write(self.path_for(key), value)
            .await
            .map_err(|err| Self::backend_error(key, &err))
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::backend_error(key, &err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_tier_round_trips_and_removes() {
        let tier = MemoryTier::new();
        tier.write("k", "v").await.expect("write");
        assert_eq!(tier.read("k").await.expect("read").as_deref(), Some("v"));
        tier.remove("k").await.expect("remove");
        assert_eq!(tier.read("k").await.expect("read"), None);
        tier.remove("k").await.expect("remove missing");
    }

    #[tokio::test]
    async fn memory_tier_enforces_byte_limit() {
        let tier = MemoryTier::with_byte_limit(4);
        tier.write("k", "1234").await.expect("at limit");

        let err = tier.write("k", "12345").await.expect_err("over limit");
        assert!(matches!(
            err,
            StoreError::QuotaExceeded { size: 5, limit: 4, .. }
        ));
        // The previous value survives a rejected write.
        assert_eq!(tier.read("k").await.expect("read").as_deref(), Some("1234"));
    }

    #[tokio::test]
    async fn file_tier_round_trips_and_tolerates_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tier = FileTier::new(dir.path());

        assert_eq!(tier.read("absent").await.expect("read"), None);
        tier.write("xwui-style-testers", "{\"preset\":\"dark\"}")
            .await
            .expect("write");
        assert_eq!(
            tier.read("xwui-style-testers").await.expect("read").as_deref(),
            Some("{\"preset\":\"dark\"}")
        );
        tier.remove("xwui-style-testers").await.expect("remove");
        assert_eq!(tier.read("xwui-style-testers").await.expect("read"), None);
    }
}
