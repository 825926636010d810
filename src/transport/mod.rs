//! Messaging transport module.
//!
//! This module provides:
//! - The [`Transport`] trait the scanner and downloader work against
//! - Channel types shared by every transport
//! - A web preview transport for public channels
//! - A transport reading Telegram Desktop JSON exports

pub mod export;
pub mod web;

use std::fmt;
use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::content::Message;
use crate::error::Result;

pub use export::ExportTransport;
pub use web::WebTransport;

/// Stream of channel messages, newest first.
///
/// Items that could not be mapped into a [`Message`] are yielded as
/// [`Error::ExtractionSkip`](crate::error::Error::ExtractionSkip).
pub type MessageStream<'a> = Pin<Box<dyn Stream<Item = Result<Message>> + Send + 'a>>;

/// Operator-supplied reference to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelRef {
    /// Public channel addressed by username.
    Public { username: String },
    /// Private channel invite (`t.me/+HASH`).
    Invite { hash: String },
}

impl ChannelRef {
    /// Normalized key used for caching scans of this channel.
    pub fn cache_key(&self) -> String {
        match self {
            ChannelRef::Public { username } => format!("@{}", username.to_lowercase()),
            ChannelRef::Invite { hash } => format!("+{}", hash),
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRef::Public { username } => write!(f, "@{}", username),
            ChannelRef::Invite { hash } => write!(f, "t.me/+{}", hash),
        }
    }
}

/// A resolved channel or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Numeric ID, when the transport exposes one.
    pub id: Option<i64>,
    pub title: String,
    pub username: Option<String>,
    pub is_private: bool,
    pub members_count: Option<u64>,
    pub description: Option<String>,
}

/// Byte-level progress callback: `(downloaded, total)`.
pub type ProgressCallback = dyn Fn(u64, Option<u64>) + Send + Sync;

/// A source of channel messages and media.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short transport name for logs.
    fn name(&self) -> &'static str;

    /// Establish the connection. Returns `false` when the transport is reachable
    /// but not usable (e.g. not authorized).
    async fn connect(&self) -> Result<bool>;

    /// Resolve a channel reference. `None` means the channel is not reachable.
    async fn resolve_channel(&self, channel: &ChannelRef) -> Result<Option<Channel>>;

    /// Stream up to `limit` messages from the channel, newest first.
    fn iter_messages<'a>(&'a self, channel: &'a Channel, limit: usize) -> MessageStream<'a>;

    /// Pinned messages, when the transport can list them separately.
    async fn pinned_messages(&self, _channel: &Channel) -> Result<Vec<Message>> {
        Ok(Vec::new())
    }

    /// Fetch the media of a message into `destination`.
    async fn fetch_media(
        &self,
        channel: &Channel,
        message_id: i64,
        destination: &Path,
        progress: &ProgressCallback,
    ) -> Result<()>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_normalized() {
        let a = ChannelRef::Public {
            username: "Filmes_HD".into(),
        };
        let b = ChannelRef::Public {
            username: "filmes_hd".into(),
        };
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "@filmes_hd");
    }
}
