//! Filename generation and manipulation.

use std::path::{Path, PathBuf};

use crate::content::ContentRecord;
use crate::error::{Error, Result};

/// Maximum characters of the title kept in a download filename.
const MAX_TITLE_CHARS: usize = 50;

/// Extension used when nothing better is known.
const DEFAULT_EXTENSION: &str = "mp4";

/// Validate and sanitize a filename by removing or replacing invalid characters.
///
/// Returns an error if the filename contains path traversal patterns.
pub fn sanitize_filename(name: &str) -> Result<String> {
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Filename cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Keep only alphanumerics, spaces, `-` and `_` from a title.
pub fn clean_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .take(MAX_TITLE_CHARS)
        .collect()
}

/// File extension for a record's media.
///
/// Taken from the attached file name, else guessed from the MIME type.
pub fn content_extension(record: &ContentRecord) -> String {
    let from_name = record
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    if let Some(ext) = from_name {
        return ext.to_lowercase();
    }

    record
        .mime_type
        .as_deref()
        .and_then(|mime| mime_guess::get_mime_extensions_str(mime))
        .and_then(|exts| preferred_extension(exts))
        .unwrap_or(DEFAULT_EXTENSION)
        .to_string()
}

/// `mime_guess` lists extensions alphabetically; prefer the common ones.
fn preferred_extension(exts: &'static [&'static str]) -> Option<&'static str> {
    const PREFERRED: &[&str] = &["mp4", "jpg", "mp3", "ogg", "pdf", "zip", "rar", "png"];
    exts.iter()
        .find(|ext| PREFERRED.contains(ext))
        .or_else(|| exts.first())
        .copied()
}

/// Download filename: `{id}_{clean title}.{ext}`, or `{id}.{ext}` without a title.
pub fn content_filename(record: &ContentRecord) -> Result<String> {
    let ext = content_extension(record);
    let title = record.title.as_deref().map(clean_title).unwrap_or_default();
    let title = title.trim();

    let name = if title.is_empty() {
        format!("{}.{}", record.id, ext)
    } else {
        format!("{}_{}.{}", record.id, title, ext)
    };

    sanitize_filename(&name)
}

/// Generate a unique filename by appending a number if the file exists.
pub fn make_unique_filename(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    let mut counter = 1;
    loop {
        let new_name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };

        let new_path = parent.join(&new_name);
        if !new_path.exists() || counter >= 1000 {
            return new_path;
        }

        counter += 1;
    }
}
