//! Read-through cache in front of the scanner.

use serde::{Deserialize, Serialize};

use crate::cache::CacheStore;
use crate::config::ScanMode;
use crate::content::ContentRecord;
use crate::error::{Error, Result};
use crate::scan::scanner::{scan_channel, ScanOptions};
use crate::transport::{Channel, ChannelRef, Transport};

/// A channel and the content found in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelContent {
    pub channel: Channel,
    pub contents: Vec<ContentRecord>,

    /// Mode the contents were extracted with.
    #[serde(default)]
    pub scan_mode: ScanMode,

    /// Whether this result was served from the cache.
    #[serde(skip)]
    pub from_cache: bool,

    /// Messages inspected by the live scan; zero when served from the cache.
    #[serde(skip)]
    pub messages_seen: usize,

    #[serde(skip)]
    pub skipped: usize,
}

/// Resolves, scans and caches channel content.
pub struct ChannelContentService<'a> {
    transport: &'a dyn Transport,
    cache: &'a dyn CacheStore,
    options: ScanOptions,
}

impl<'a> ChannelContentService<'a> {
    pub fn new(transport: &'a dyn Transport, cache: &'a dyn CacheStore, options: ScanOptions) -> Self {
        Self {
            transport,
            cache,
            options,
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Content of a channel, from the cache when fresh.
    pub async fn get_channel_content(&self, channel_ref: &ChannelRef) -> Result<ChannelContent> {
        self.fetch(channel_ref, false).await
    }

    /// Content of a channel; `refresh` skips the cache read.
    pub async fn fetch(&self, channel_ref: &ChannelRef, refresh: bool) -> Result<ChannelContent> {
        let key = channel_ref.cache_key();

        if !refresh {
            if let Some(cached) = self.read_cache(&key).await {
                tracing::info!(
                    "Using cached content for {} ({} items)",
                    channel_ref,
                    cached.contents.len()
                );
                return Ok(cached);
            }
        }

        let channel = self
            .transport
            .resolve_channel(channel_ref)
            .await?
            .ok_or_else(|| Error::ChannelUnreachable(channel_ref.to_string()))?;

        let report = scan_channel(self.transport, &channel, &self.options).await?;
        let content = ChannelContent {
            channel,
            contents: report.records,
            scan_mode: self.options.mode,
            from_cache: false,
            messages_seen: report.messages_seen,
            skipped: report.skipped,
        };

        if !content.contents.is_empty() {
            self.write_cache(&key, &content).await;
        }

        Ok(content)
    }

    /// Drop the cached scan of a channel.
    pub async fn invalidate(&self, channel_ref: &ChannelRef) -> Result<()> {
        self.cache.delete(&channel_ref.cache_key()).await
    }

    async fn read_cache(&self, key: &str) -> Option<ChannelContent> {
        let value = match self.cache.get(key).await {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!("Cache read failed, scanning live: {}", e);
                return None;
            }
        };

        match serde_json::from_value::<ChannelContent>(value) {
            Ok(mut content) if content.scan_mode == self.options.mode => {
                content.from_cache = true;
                Some(content)
            }
            Ok(_) => {
                tracing::debug!("Cached scan of '{}' used another mode", key);
                None
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache entry '{}': {}", key, e);
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, content: &ChannelContent) {
        let value = match serde_json::to_value(content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to serialize scan for cache: {}", e);
                return;
            }
        };

        if let Err(e) = self.cache.set(key, value).await {
            tracing::warn!("Failed to write cache: {}", e);
        }
    }
}
