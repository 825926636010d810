//! Extracted content records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse classification of a record's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Video,
    Audio,
    Photo,
    Pdf,
    Archive,
    Document,
    ExternalLink,
    CourseContent,
    Text,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
            ContentKind::Photo => "photo",
            ContentKind::Pdf => "pdf",
            ContentKind::Archive => "archive",
            ContentKind::Document => "document",
            ContentKind::ExternalLink => "external link",
            ContentKind::CourseContent => "course content",
            ContentKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Content found in a single message.
///
/// Records are created once by the extractor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Source message ID.
    pub id: i64,

    /// First line of the message that is not metadata.
    pub title: Option<String>,

    /// Full message text, verbatim.
    pub text: String,

    pub date: DateTime<Utc>,

    /// Username credited as the source of the content.
    pub indexed_by: Option<String>,

    /// Normalized size, e.g. `"4.5 gb"`.
    pub size: Option<String>,

    /// Normalized duration, e.g. `"2h 30min"`.
    pub duration: Option<String>,

    pub kind: ContentKind,

    /// Attached file name, when the transport reports one.
    #[serde(default)]
    pub file_name: Option<String>,

    /// Attached file size in bytes.
    #[serde(default)]
    pub file_size: Option<u64>,

    /// MIME type of the attachment.
    #[serde(default)]
    pub mime_type: Option<String>,

    /// External link for hosted content.
    #[serde(default)]
    pub url: Option<String>,

    /// Whether the attachment can be fetched through the transport.
    #[serde(default)]
    pub downloadable: bool,

    #[serde(default)]
    pub forwarded: bool,
}

impl ContentRecord {
    /// Title for display, falling back to the message ID.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => format!("Content {}", self.id),
        }
    }
}
