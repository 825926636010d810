//! Message-to-content extraction.
//!
//! Turns one [`Message`] into at most one [`ContentRecord`]. Metadata fields
//! are best-effort: a pattern that matches but fails to parse is skipped and
//! the next alternative is tried.

use regex::Regex;

use crate::config::ScanMode;
use crate::content::message::{Media, Message};
use crate::content::patterns::{
    find_channel_link, format_number, is_denied_attribution, is_known_host, is_metadata_line,
    ATTRIBUTION_PATTERNS, COURSE_KEYWORDS, DURATION_PATTERNS, SIZE_PATTERNS,
};
use crate::content::record::{ContentKind, ContentRecord};

/// Metadata recovered from a message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextMetadata {
    pub title: Option<String>,
    pub size: Option<String>,
    pub duration: Option<String>,
    pub indexed_by: Option<String>,
}

impl TextMetadata {
    /// Whether the metadata alone is enough to call the message indexed content.
    pub fn is_indexed_content(&self) -> bool {
        self.indexed_by.is_some() || (self.size.is_some() && self.duration.is_some())
    }
}

/// Extract a content record from a message.
///
/// In [`ScanMode::Media`] a record is produced for every message carrying
/// media, whatever its text says. In [`ScanMode::Indexed`] a record needs an
/// attribution, or both a size and a duration.
pub fn extract_content(message: &Message, mode: ScanMode) -> Option<ContentRecord> {
    let text = message.text();
    if text.is_none() && message.media.is_none() {
        return None;
    }

    let metadata = text.map(extract_metadata).unwrap_or_default();

    let keep = if mode.require_media() {
        message.has_media()
    } else {
        metadata.is_indexed_content()
    };
    if !keep {
        return None;
    }

    Some(build_record(message, metadata))
}

/// Run every metadata extractor over a message body.
pub fn extract_metadata(text: &str) -> TextMetadata {
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let lower = text.to_lowercase();

    TextMetadata {
        title: extract_title(&lines),
        size: extract_size(&lower),
        duration: extract_duration(&lower),
        indexed_by: extract_attribution(&lines).or_else(|| attribution_from_link(text)),
    }
}

/// First line that does not look like metadata.
fn extract_title(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find(|line| !is_metadata_line(line))
        .map(|line| line.to_string())
}

/// First size pattern whose number parses, as `"<number> <unit>"`.
fn extract_size(lower: &str) -> Option<String> {
    first_parsed(&SIZE_PATTERNS, lower, |caps| {
        let number: f64 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(2)?.as_str();
        Some(format!("{} {}", format_number(number), unit))
    })
}

/// First duration pattern whose numbers parse, as `"<h>h <m>min"`.
fn extract_duration(lower: &str) -> Option<String> {
    first_parsed(&DURATION_PATTERNS, lower, |caps| {
        let hours: u64 = caps.get(1)?.as_str().parse().ok()?;
        let minutes: u64 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        Some(format!("{}h {}min", hours, minutes))
    })
}

fn first_parsed<F>(patterns: &[Regex], haystack: &str, parse: F) -> Option<String>
where
    F: Fn(&regex::Captures<'_>) -> Option<String>,
{
    patterns
        .iter()
        .filter_map(|pattern| pattern.captures(haystack))
        .find_map(|caps| parse(&caps))
}

/// Attribution search: patterns in precedence order, each tried on every line.
fn extract_attribution(lines: &[&str]) -> Option<String> {
    for pattern in ATTRIBUTION_PATTERNS.iter() {
        for line in lines {
            let Some(username) = pattern
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim_matches('@'))
            else {
                continue;
            };
            if !username.is_empty() && !is_denied_attribution(username) {
                return Some(username.to_string());
            }
        }
    }
    None
}

fn attribution_from_link(text: &str) -> Option<String> {
    find_channel_link(text).filter(|name| !is_denied_attribution(name))
}

fn build_record(message: &Message, metadata: TextMetadata) -> ContentRecord {
    let text = message.text.clone().unwrap_or_default();
    let kind = classify(message.media.as_ref(), &text);

    let (file_name, file_size, url) = match &message.media {
        Some(Media::Document {
            file_name, size, ..
        }) => (file_name.clone(), *size, None),
        Some(Media::Photo { size }) => (None, *size, None),
        Some(Media::WebPage { url }) => (None, None, Some(url.clone())),
        None => (None, None, None),
    };

    ContentRecord {
        id: message.id,
        title: metadata.title,
        text,
        date: message.date,
        indexed_by: metadata.indexed_by,
        size: metadata.size,
        duration: metadata.duration,
        kind,
        file_name,
        file_size,
        mime_type: message
            .media
            .as_ref()
            .and_then(Media::mime_type)
            .map(str::to_string),
        url,
        downloadable: message.media.as_ref().is_some_and(Media::is_downloadable),
        forwarded: message.forwarded,
    }
}

/// Classify content from its attachment, falling back to course keywords.
fn classify(media: Option<&Media>, text: &str) -> ContentKind {
    let from_media = match media {
        Some(Media::Document {
            mime_type,
            duration_secs,
            ..
        }) => {
            let mime = mime_type.as_deref().unwrap_or("").to_lowercase();
            if duration_secs.is_some() || mime.contains("video") {
                Some(ContentKind::Video)
            } else if mime.contains("audio") {
                Some(ContentKind::Audio)
            } else if mime.contains("pdf") {
                Some(ContentKind::Pdf)
            } else if ["zip", "rar", "x-compressed"]
                .iter()
                .any(|t| mime.contains(t))
            {
                Some(ContentKind::Archive)
            } else {
                None
            }
        }
        Some(Media::Photo { .. }) => Some(ContentKind::Photo),
        Some(Media::WebPage { url }) if is_known_host(url) => Some(ContentKind::ExternalLink),
        _ => None,
    };

    if let Some(kind) = from_media {
        return kind;
    }

    let lower = text.to_lowercase();
    if COURSE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ContentKind::CourseContent
    } else if matches!(media, Some(Media::Document { .. })) {
        ContentKind::Document
    } else {
        ContentKind::Text
    }
}
