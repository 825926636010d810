//! JSON file cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::cache::CacheStore;
use crate::error::{Error, Result};

/// Cache file name inside the cache directory.
pub const CACHE_FILE: &str = "channels.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    data: Value,
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    cached_at: DateTime<Utc>,
}

type Entries = BTreeMap<String, CacheEntry>;

/// Cache persisted as a single `channels.json` mapping key to `{data, cached_at}`.
///
/// Expired entries are purged when read.
pub struct FileCache {
    path: PathBuf,
    ttl: Duration,
    lock: Mutex<()>,
}

impl FileCache {
    /// Open the cache in `dir`, creating the directory if needed.
    pub fn open(dir: &Path, ttl: Duration) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(CACHE_FILE),
            ttl,
            lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(entry.cached_at);
        match age.to_std() {
            Ok(age) => age < self.ttl,
            // Stamped in the future: clock moved backwards, keep it.
            Err(_) => true,
        }
    }

    async fn load(&self) -> Result<Entries> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Entries::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::CacheUnavailable(format!("{} is corrupt: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(Error::CacheUnavailable(format!(
                "Cannot read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Load for a write; a corrupt file is replaced rather than blocking writes.
    async fn load_for_write(&self) -> Entries {
        match self.load().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Discarding unreadable cache: {}", e);
                Entries::new()
            }
        }
    }

    async fn store(&self, entries: &Entries) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FileCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;

        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };

        if self.is_fresh(entry, Utc::now()) {
            return Ok(Some(entry.data.clone()));
        }

        tracing::debug!("Cache entry '{}' expired", key);
        entries.remove(key);
        if let Err(e) = self.store(&entries).await {
            tracing::warn!("Failed to purge expired cache entry: {}", e);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load_for_write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                cached_at: Utc::now(),
            },
        );
        self.store(&entries).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load_for_write().await;
        if entries.remove(key).is_some() {
            self.store(&entries).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.store(&Entries::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path(), 8 * HOUR).unwrap();

        assert_eq!(cache.get("@chan").await.unwrap(), None);

        cache.set("@chan", json!({"contents": [1, 2]})).await.unwrap();
        assert_eq!(
            cache.get("@chan").await.unwrap(),
            Some(json!({"contents": [1, 2]}))
        );
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileCache::open(dir.path(), HOUR)
            .unwrap()
            .set("@chan", json!("data"))
            .await
            .unwrap();

        let cache = FileCache::open(dir.path(), HOUR).unwrap();
        assert_eq!(cache.get("@chan").await.unwrap(), Some(json!("data")));
    }

    #[tokio::test]
    async fn test_expired_entry_is_purged() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path(), 8 * HOUR).unwrap();

        let stale = Utc::now() - chrono::Duration::hours(9);
        let content = json!({
            "@old": {"data": "old", "cached_at": stale},
            "@new": {"data": "new", "cached_at": Utc::now()},
        });
        std::fs::write(cache.path(), content.to_string()).unwrap();

        assert_eq!(cache.get("@old").await.unwrap(), None);
        assert_eq!(cache.get("@new").await.unwrap(), Some(json!("new")));

        let on_disk: Value =
            serde_json::from_str(&std::fs::read_to_string(cache.path()).unwrap()).unwrap();
        assert!(on_disk.get("@old").is_none());
        assert!(on_disk.get("@new").is_some());
    }

    #[tokio::test]
    async fn test_naive_cached_at_is_read_as_utc() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path(), 8 * HOUR).unwrap();

        let fresh = Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        let stale = (Utc::now() - chrono::Duration::hours(9))
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        let content = json!({
            "@new": {"data": "new", "cached_at": fresh},
            "@old": {"data": "old", "cached_at": stale},
        });
        std::fs::write(cache.path(), content.to_string()).unwrap();

        assert_eq!(tokio_test::assert_ok!(cache.get("@new").await), Some(json!("new")));
        assert_eq!(tokio_test::assert_ok!(cache.get("@old").await), None);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path(), HOUR).unwrap();
        cache.set("a", json!(1)).await.unwrap();
        cache.set("b", json!(2)).await.unwrap();

        cache.delete("a").await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("b").await.unwrap(), Some(json!(2)));

        cache.clear().await.unwrap();
        assert_eq!(cache.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::open(dir.path(), HOUR).unwrap();
        std::fs::write(cache.path(), "{not json").unwrap();

        assert!(matches!(
            cache.get("a").await,
            Err(Error::CacheUnavailable(_))
        ));

        // Writes replace the corrupt file.
        tokio_test::assert_ok!(cache.set("a", json!(1)).await);
        assert_eq!(tokio_test::assert_ok!(cache.get("a").await), Some(json!(1)));
    }
}
