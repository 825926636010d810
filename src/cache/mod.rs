//! Channel scan cache.
//!
//! This module provides:
//! - The [`CacheStore`] trait the content service reads through
//! - A JSON file cache with a freshness window

pub mod file;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use file::FileCache;

/// Key-value store for serialized channel scans.
///
/// Implementations decide freshness: `get` returns `None` for entries older
/// than the store's freshness window.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a fresh entry.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store an entry, stamping it with the current time.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove one entry.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;
}
