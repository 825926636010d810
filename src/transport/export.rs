//! Telegram Desktop JSON export transport.
//!
//! Reads `result.json` from an export directory. Both single-chat exports and
//! full account exports (`chats.list`) are understood; media files are copied
//! out of the export directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream;
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::content::patterns::is_known_host;
use crate::content::{Media, Message};
use crate::error::{Error, Result};
use crate::timestamp;
use crate::transport::{Channel, ChannelRef, MessageStream, ProgressCallback, Transport};

/// Name of the export's JSON file.
pub const EXPORT_FILE: &str = "result.json";

/// Copy buffer size.
const CHUNK_SIZE: usize = 64 * 1024;

/// Placeholder the exporter writes for skipped files.
const FILE_NOT_INCLUDED: &str = "(File not included";

#[derive(Debug, Deserialize)]
struct ExportRoot {
    #[serde(flatten)]
    chat: Option<ExportChat>,
    #[serde(default)]
    chats: Option<ExportChatList>,
}

#[derive(Debug, Deserialize)]
struct ExportChatList {
    #[serde(default)]
    list: Vec<ExportChat>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExportChat {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    kind: String,
    id: i64,
    #[serde(default)]
    messages: Vec<ExportMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExportMessage {
    id: i64,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    date_unixtime: Option<String>,
    #[serde(default)]
    text: ExportText,
    #[serde(default)]
    forwarded_from: Option<String>,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    photo_file_size: Option<u64>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    file_size: Option<u64>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    duration_seconds: Option<u64>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    message_id: Option<i64>,
}

/// Message text: a plain string, or a list of plain and entity fragments.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ExportText {
    Plain(String),
    Parts(Vec<TextPart>),
}

impl Default for ExportText {
    fn default() -> Self {
        ExportText::Plain(String::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TextPart {
    Plain(String),
    Entity {
        #[serde(rename = "type", default)]
        kind: String,
        #[serde(default)]
        text: String,
        #[serde(default)]
        href: Option<String>,
    },
}

impl ExportText {
    fn render(&self) -> String {
        match self {
            ExportText::Plain(text) => text.clone(),
            ExportText::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    TextPart::Plain(text) => text.as_str(),
                    TextPart::Entity { text, .. } => text.as_str(),
                })
                .collect(),
        }
    }

    /// Links found in entity fragments.
    fn links(&self) -> Vec<String> {
        match self {
            ExportText::Plain(_) => Vec::new(),
            ExportText::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    TextPart::Entity { kind, text, href } => match kind.as_str() {
                        "text_link" => href.clone(),
                        "link" => Some(text.clone()),
                        _ => None,
                    },
                    TextPart::Plain(_) => None,
                })
                .collect(),
        }
    }
}

impl ExportMessage {
    fn is_message(&self) -> bool {
        self.kind.is_empty() || self.kind == "message"
    }

    fn parse_date(&self) -> Option<DateTime<Utc>> {
        if let Some(secs) = self
            .date_unixtime
            .as_deref()
            .and_then(|raw| raw.parse::<i64>().ok())
        {
            return DateTime::from_timestamp(secs, 0);
        }
        let raw = self.date.as_deref()?;
        timestamp::parse(raw)
    }

    fn media(&self) -> Option<Media> {
        if self.photo.is_some() {
            return Some(Media::Photo {
                size: self.photo_file_size,
            });
        }

        if self.file.is_some() || self.mime_type.is_some() {
            let is_video = matches!(
                self.media_type.as_deref(),
                Some("video_file" | "video_message" | "animation")
            );
            return Some(Media::Document {
                file_name: self.file_name.clone(),
                mime_type: self.mime_type.clone(),
                size: self.file_size,
                duration_secs: if is_video { self.duration_seconds } else { None },
            });
        }

        self.text
            .links()
            .into_iter()
            .find(|url| is_known_host(url))
            .map(|url| Media::WebPage { url })
    }

    fn to_message(&self) -> Result<Message> {
        let date = self.parse_date().ok_or_else(|| Error::ExtractionSkip {
            message_id: Some(self.id),
            reason: format!("invalid date {:?}", self.date),
        })?;

        let text = self.text.render();
        Ok(Message {
            id: self.id,
            text: if text.is_empty() { None } else { Some(text) },
            media: self.media(),
            date,
            forwarded: self.forwarded_from.is_some(),
        })
    }

    /// Relative path of the exported media file, if it was included.
    fn media_path(&self) -> Option<&str> {
        self.file
            .as_deref()
            .or(self.photo.as_deref())
            .filter(|path| !path.starts_with(FILE_NOT_INCLUDED))
    }
}

/// Transport over a Telegram Desktop JSON export.
pub struct ExportTransport {
    root: PathBuf,
    chats: Vec<ExportChat>,
}

impl ExportTransport {
    /// Load an export directory.
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(EXPORT_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Transport(format!("Cannot read export {}: {}", path.display(), e))
        })?;
        let chats = parse_export(&content)?;

        tracing::debug!("Loaded export with {} chat(s)", chats.len());

        Ok(Self {
            root: root.to_path_buf(),
            chats,
        })
    }

    fn find_chat(&self, channel: &Channel) -> Result<&ExportChat> {
        self.chats
            .iter()
            .find(|chat| Some(chat.id) == channel.id)
            .ok_or_else(|| Error::ChannelUnreachable(format!("{} not in export", channel.title)))
    }
}

fn parse_export(content: &str) -> Result<Vec<ExportChat>> {
    let root: ExportRoot = serde_json::from_str(content)?;

    let mut chats = Vec::new();
    if let Some(chat) = root.chat {
        chats.push(chat);
    }
    if let Some(list) = root.chats {
        chats.extend(list.list);
    }

    if chats.is_empty() {
        return Err(Error::Transport("Export contains no chats".into()));
    }

    Ok(chats)
}

fn to_channel(chat: &ExportChat) -> Channel {
    Channel {
        id: Some(chat.id),
        title: chat.name.clone().unwrap_or_else(|| format!("Chat {}", chat.id)),
        username: None,
        is_private: chat.kind != "public_channel" && chat.kind != "public_supergroup",
        members_count: None,
        description: None,
    }
}

#[async_trait]
impl Transport for ExportTransport {
    fn name(&self) -> &'static str {
        "export"
    }

    async fn connect(&self) -> Result<bool> {
        Ok(!self.chats.is_empty())
    }

    async fn resolve_channel(&self, channel: &ChannelRef) -> Result<Option<Channel>> {
        // A single-chat export serves that chat whatever it is called.
        if self.chats.len() == 1 {
            return Ok(self.chats.first().map(to_channel));
        }

        let ChannelRef::Public { username } = channel else {
            return Ok(None);
        };

        let wanted = username.to_lowercase();
        Ok(self
            .chats
            .iter()
            .find(|chat| {
                chat.id.to_string() == wanted
                    || chat
                        .name
                        .as_deref()
                        .map(|name| name.to_lowercase().replace(' ', "_") == wanted)
                        .unwrap_or(false)
            })
            .map(to_channel))
    }

    fn iter_messages<'a>(&'a self, channel: &'a Channel, limit: usize) -> MessageStream<'a> {
        let items: Vec<Result<Message>> = match self.find_chat(channel) {
            Ok(chat) => {
                let mut messages: Vec<&ExportMessage> =
                    chat.messages.iter().filter(|m| m.is_message()).collect();
                messages.sort_by(|a, b| b.id.cmp(&a.id));
                messages
                    .into_iter()
                    .take(limit)
                    .map(ExportMessage::to_message)
                    .collect()
            }
            Err(e) => vec![Err(e)],
        };

        Box::pin(stream::iter(items))
    }

    async fn pinned_messages(&self, channel: &Channel) -> Result<Vec<Message>> {
        let chat = self.find_chat(channel)?;

        let pinned: HashSet<i64> = chat
            .messages
            .iter()
            .filter(|m| m.action.as_deref() == Some("pin_message"))
            .filter_map(|m| m.message_id)
            .collect();

        Ok(chat
            .messages
            .iter()
            .filter(|m| m.is_message() && pinned.contains(&m.id))
            .filter_map(|m| m.to_message().ok())
            .collect())
    }

    async fn fetch_media(
        &self,
        channel: &Channel,
        message_id: i64,
        destination: &Path,
        progress: &ProgressCallback,
    ) -> Result<()> {
        let chat = self.find_chat(channel)?;
        let message = chat
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or_else(|| Error::DownloadFailed(format!("Message {} not found", message_id)))?;

        let relative = message.media_path().ok_or_else(|| {
            Error::DownloadFailed(format!(
                "Media of message {} was not included in the export",
                message_id
            ))
        })?;

        let source = self.root.join(relative);
        if !source.starts_with(&self.root) || relative.contains("..") {
            return Err(Error::InvalidFilename(relative.to_string()));
        }

        let mut input = File::open(&source).await.map_err(|e| {
            Error::DownloadFailed(format!("Cannot open {}: {}", source.display(), e))
        })?;
        let total = input.metadata().await.ok().map(|m| m.len());
        let mut output = File::create(destination).await?;

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut copied: u64 = 0;
        loop {
            let read = input.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            output.write_all(&buffer[..read]).await?;
            copied += read as u64;
            progress(copied, total);
        }

        output.flush().await?;
        Ok(())
    }
}
