//! Download state tracking.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// State file name inside the download directory.
pub const STATE_FILE: &str = "state.json";

/// Where and when a content item was downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub file_path: PathBuf,
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    pub downloaded_at: DateTime<Utc>,
}

/// Persistent record of downloaded content, keyed by message ID.
///
/// Saved as `state.json` in the download directory after every change.
#[derive(Debug)]
pub struct DownloadStateTracker {
    path: PathBuf,
    entries: BTreeMap<String, DownloadEntry>,
}

impl DownloadStateTracker {
    /// Open the tracker for a download directory, creating the directory.
    ///
    /// An unreadable state file is logged and treated as empty.
    pub fn open(download_dir: &Path) -> Result<Self> {
        fs::create_dir_all(download_dir)?;
        let path = download_dir.join(STATE_FILE);

        let entries = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, entries })
    }

    /// Whether a content ID was downloaded before.
    pub fn is_downloaded(&self, id: i64) -> bool {
        self.entries.contains_key(&id.to_string())
    }

    /// Record a completed download and persist the state.
    pub fn mark_downloaded(&mut self, id: i64, file_path: &Path) -> Result<()> {
        self.entries.insert(
            id.to_string(),
            DownloadEntry {
                file_path: file_path.to_path_buf(),
                downloaded_at: Utc::now(),
            },
        );
        self.save()
    }

    /// Recorded path of a download.
    pub fn get_path(&self, id: i64) -> Option<&Path> {
        self.entries
            .get(&id.to_string())
            .map(|entry| entry.file_path.as_path())
    }

    /// Recorded path of a download, only if the file is still on disk.
    pub fn existing_path(&self, id: i64) -> Option<&Path> {
        self.get_path(id).filter(|path| path.exists())
    }

    /// Forget a download. Returns whether it was tracked.
    pub fn remove(&mut self, id: i64) -> Result<bool> {
        let removed = self.entries.remove(&id.to_string()).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Every recorded file path.
    pub fn downloaded_files(&self) -> HashSet<PathBuf> {
        self.entries
            .values()
            .map(|entry| entry.file_path.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Statistics for one interactive session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub channels_scanned: u64,
    pub downloaded: u64,
    pub already_downloaded: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub bytes_downloaded: u64,
}

impl SessionStats {
    pub fn record_download(&mut self, bytes: u64) {
        self.downloaded += 1;
        self.bytes_downloaded += bytes;
    }

    /// Items attempted this session.
    pub fn total_attempted(&self) -> u64 {
        self.downloaded + self.already_downloaded + self.failed + self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = DownloadStateTracker::open(dir.path()).unwrap();

        assert!(!tracker.is_downloaded(42));
        assert_eq!(tracker.get_path(42), None);

        let file = dir.path().join("42_Filme.mp4");
        tracker.mark_downloaded(42, &file).unwrap();

        assert!(tracker.is_downloaded(42));
        assert_eq!(tracker.get_path(42), Some(file.as_path()));
        assert_eq!(tracker.existing_path(42), None);

        std::fs::write(&file, b"x").unwrap();
        assert_eq!(tracker.existing_path(42), Some(file.as_path()));
    }

    #[test]
    fn test_reads_naive_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let state = r#"{"42": {"file_path": "downloads/42_Filme.mp4", "downloaded_at": "2024-06-01T10:00:00.123456"}}"#;
        std::fs::write(dir.path().join(STATE_FILE), state).unwrap();

        let tracker = DownloadStateTracker::open(dir.path()).unwrap();
        assert!(tracker.is_downloaded(42));
        assert_eq!(
            tracker.get_path(42),
            Some(Path::new("downloads/42_Filme.mp4"))
        );
    }

    #[test]
    fn test_state_persists() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("7.mp4");
        DownloadStateTracker::open(dir.path())
            .unwrap()
            .mark_downloaded(7, &file)
            .unwrap();

        let tracker = DownloadStateTracker::open(dir.path()).unwrap();
        assert!(tracker.is_downloaded(7));
        assert_eq!(tracker.downloaded_files(), HashSet::from([file]));

        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(STATE_FILE)).unwrap(),
        )
        .unwrap();
        assert!(raw["7"]["file_path"].is_string());
        assert!(raw["7"]["downloaded_at"].is_string());
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = DownloadStateTracker::open(dir.path()).unwrap();
        tracker.mark_downloaded(1, Path::new("a.mp4")).unwrap();

        assert!(tracker.remove(1).unwrap());
        assert!(!tracker.remove(1).unwrap());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_corrupt_state_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STATE_FILE), "[broken").unwrap();

        let tracker = DownloadStateTracker::open(dir.path()).unwrap();
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_session_stats() {
        let mut stats = SessionStats::default();
        stats.record_download(100);
        stats.record_download(50);
        stats.failed += 1;
        assert_eq!(stats.downloaded, 2);
        assert_eq!(stats.bytes_downloaded, 150);
        assert_eq!(stats.total_attempted(), 3);
    }
}
