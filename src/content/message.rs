//! Transport-neutral message representation.
//!
//! Every transport maps its native message type into [`Message`] so the
//! extractor never sees transport internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::patterns::is_known_host;

/// Media attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Media {
    /// A file attachment (video, audio, archive, pdf, ...).
    Document {
        file_name: Option<String>,
        mime_type: Option<String>,
        size: Option<u64>,
        /// Set when the document carries video attributes.
        duration_secs: Option<u64>,
    },
    /// A compressed photo.
    Photo { size: Option<u64> },
    /// A link preview.
    WebPage { url: String },
}

impl Media {
    /// Whether this media counts as downloadable content.
    ///
    /// Link previews only count when they point at a known hosting service.
    pub fn is_content(&self) -> bool {
        match self {
            Media::Document { .. } | Media::Photo { .. } => true,
            Media::WebPage { url } => is_known_host(url),
        }
    }

    /// Whether the media can be fetched through the transport.
    pub fn is_downloadable(&self) -> bool {
        matches!(self, Media::Document { .. } | Media::Photo { .. })
    }

    /// MIME type, when known.
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Media::Document { mime_type, .. } => mime_type.as_deref(),
            Media::Photo { .. } => Some("image/jpeg"),
            Media::WebPage { .. } => None,
        }
    }
}

/// A single channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub text: Option<String>,
    pub media: Option<Media>,
    pub date: DateTime<Utc>,
    pub forwarded: bool,
}

impl Message {
    /// Create a plain text message.
    pub fn new(id: i64, text: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id,
            text: Some(text.into()),
            media: None,
            date,
            forwarded: false,
        }
    }

    /// Attach media to the message.
    pub fn with_media(mut self, media: Media) -> Self {
        self.media = Some(media);
        self
    }

    /// Whether the message carries actual media content.
    pub fn has_media(&self) -> bool {
        self.media.as_ref().is_some_and(Media::is_content)
    }

    /// Message text, if it has any non-whitespace content.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_has_media() {
        let msg = Message::new(1, "hello", date());
        assert!(!msg.has_media());

        let msg = msg.with_media(Media::Photo { size: None });
        assert!(msg.has_media());
    }

    #[test]
    fn test_web_page_only_counts_for_known_hosts() {
        let msg = Message::new(1, "", date()).with_media(Media::WebPage {
            url: "https://mega.nz/folder/abc".into(),
        });
        assert!(msg.has_media());

        let msg = Message::new(1, "", date()).with_media(Media::WebPage {
            url: "https://example.com/blog".into(),
        });
        assert!(!msg.has_media());
    }

    #[test]
    fn test_whitespace_text_is_absent() {
        let msg = Message::new(1, "   \n\t ", date());
        assert_eq!(msg.text(), None);
    }
}
