//! Content downloading.

use std::path::{Path, PathBuf};

use crate::content::ContentRecord;
use crate::download::state::DownloadStateTracker;
use crate::error::{Error, Result};
use crate::fs::{content_filename, ensure_dir, make_unique_filename, part_path};
use crate::output::progress::create_download_bar;
use crate::transport::{Channel, Transport};

/// Options for a single download.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadOptions {
    /// Download again even if the item is tracked and on disk.
    pub force: bool,
    pub show_progress: bool,
}

/// What a download attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    /// Tracked and still on disk; nothing was fetched.
    AlreadyDownloaded(PathBuf),
}

/// Removes a partial file unless disarmed.
///
/// Dropping the download future (e.g. on Ctrl-C) drops the guard too.
struct PartFileGuard {
    path: PathBuf,
    armed: bool,
}

impl PartFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartFileGuard {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove partial file {}: {}", self.path.display(), e);
            } else {
                tracing::debug!("Removed partial file {}", self.path.display());
            }
        }
    }
}

/// Download the media of a content record into `directory`.
///
/// The file is written to a hidden `.part` sibling and renamed into place on
/// success; only then is the tracker updated.
pub async fn download_content(
    transport: &dyn Transport,
    channel: &Channel,
    tracker: &mut DownloadStateTracker,
    directory: &Path,
    record: &ContentRecord,
    options: DownloadOptions,
) -> Result<DownloadOutcome> {
    if !options.force {
        if let Some(existing) = tracker.existing_path(record.id) {
            tracing::debug!("Content {} already at {}", record.id, existing.display());
            return Ok(DownloadOutcome::AlreadyDownloaded(existing.to_path_buf()));
        }
    }

    if !record.downloadable {
        let hint = record
            .url
            .as_deref()
            .map(|url| format!(" (open {})", url))
            .unwrap_or_default();
        return Err(Error::DownloadFailed(format!(
            "Content {} has no downloadable media{}",
            record.id, hint
        )));
    }

    ensure_dir(directory)?;

    let mut target = directory.join(content_filename(record)?);
    let tracked_here = tracker.get_path(record.id) == Some(target.as_path());
    if target.exists() && !tracked_here && !options.force {
        target = make_unique_filename(&target);
    }

    let part = part_path(&target);
    let mut guard = PartFileGuard::new(part.clone());

    tracing::info!("Downloading content {} to {}", record.id, target.display());

    let bar = create_download_bar(record.file_size, options.show_progress);
    let progress_bar = bar.clone();
    let progress = move |downloaded: u64, total: Option<u64>| {
        if let Some(total) = total {
            if progress_bar.length() != Some(total) {
                progress_bar.set_length(total);
            }
        }
        progress_bar.set_position(downloaded);
    };

    let fetched = transport
        .fetch_media(channel, record.id, &part, &progress)
        .await;
    bar.finish_and_clear();
    fetched?;

    let bytes = tokio::fs::metadata(&part).await?.len();
    tokio::fs::rename(&part, &target).await?;
    guard.disarm();

    tracker.mark_downloaded(record.id, &target)?;
    tracing::info!("Downloaded {} ({} bytes)", target.display(), bytes);

    Ok(DownloadOutcome::Downloaded {
        path: target,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use crate::fs::paths::is_part_file;
    use crate::transport::mock::{test_channel, MockTransport};
    use crate::transport::{ChannelRef, MessageStream, ProgressCallback};
    use async_trait::async_trait;
    use chrono::Utc;

    fn record(id: i64, title: &str) -> ContentRecord {
        ContentRecord {
            id,
            title: Some(title.to_string()),
            text: title.to_string(),
            date: Utc::now(),
            indexed_by: None,
            size: None,
            duration: None,
            kind: ContentKind::Video,
            file_name: Some("video.mp4".into()),
            file_size: Some(5),
            mime_type: Some("video/mp4".into()),
            url: None,
            downloadable: true,
            forwarded: false,
        }
    }

    fn quiet(force: bool) -> DownloadOptions {
        DownloadOptions {
            force,
            show_progress: false,
        }
    }

    fn transport_with(id: i64, data: &[u8]) -> MockTransport {
        let mut transport = MockTransport::with_messages(vec![]);
        transport.media.insert(id, data.to_vec());
        transport
    }

    fn part_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|e| is_part_file(&e.as_ref().unwrap().path()))
            .count()
    }

    /// Writes a partial file, then never finishes.
    struct StallingTransport;

    #[async_trait]
    impl Transport for StallingTransport {
        fn name(&self) -> &'static str {
            "stalling"
        }

        async fn connect(&self) -> Result<bool> {
            Ok(true)
        }

        async fn resolve_channel(&self, _channel: &ChannelRef) -> Result<Option<Channel>> {
            Ok(None)
        }

        fn iter_messages<'a>(&'a self, _channel: &'a Channel, _limit: usize) -> MessageStream<'a> {
            Box::pin(futures::stream::empty())
        }

        async fn fetch_media(
            &self,
            _channel: &Channel,
            _message_id: i64,
            destination: &Path,
            _progress: &ProgressCallback,
        ) -> Result<()> {
            tokio::fs::write(destination, b"partial").await?;
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_download_writes_file_and_tracks_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = DownloadStateTracker::open(dir.path()).unwrap();
        let transport = transport_with(42, b"hello");

        let outcome = download_content(
            &transport,
            &test_channel(),
            &mut tracker,
            dir.path(),
            &record(42, "Filme: Teste"),
            quiet(false),
        )
        .await
        .unwrap();

        let expected = dir.path().join("42_Filme Teste.mp4");
        assert_eq!(
            outcome,
            DownloadOutcome::Downloaded {
                path: expected.clone(),
                bytes: 5
            }
        );
        assert_eq!(std::fs::read(&expected).unwrap(), b"hello");
        assert_eq!(tracker.get_path(42), Some(expected.as_path()));
        assert_eq!(part_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_second_download_is_skipped_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = DownloadStateTracker::open(dir.path()).unwrap();
        let transport = transport_with(1, b"data");
        let rec = record(1, "Aula");

        download_content(&transport, &test_channel(), &mut tracker, dir.path(), &rec, quiet(false))
            .await
            .unwrap();

        let again =
            download_content(&transport, &test_channel(), &mut tracker, dir.path(), &rec, quiet(false))
                .await
                .unwrap();
        assert!(matches!(again, DownloadOutcome::AlreadyDownloaded(_)));

        let forced =
            download_content(&transport, &test_channel(), &mut tracker, dir.path(), &rec, quiet(true))
                .await
                .unwrap();
        assert_eq!(
            forced,
            DownloadOutcome::Downloaded {
                path: dir.path().join("1_Aula.mp4"),
                bytes: 4
            }
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = DownloadStateTracker::open(dir.path()).unwrap();
        tracker
            .mark_downloaded(3, &dir.path().join("gone.mp4"))
            .unwrap();
        let transport = transport_with(3, b"abc");

        let outcome = download_content(
            &transport,
            &test_channel(),
            &mut tracker,
            dir.path(),
            &record(3, "Volta"),
            quiet(false),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, DownloadOutcome::Downloaded { .. }));
    }

    #[tokio::test]
    async fn test_failed_download_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = DownloadStateTracker::open(dir.path()).unwrap();
        let transport = MockTransport::with_messages(vec![]);

        let result = download_content(
            &transport,
            &test_channel(),
            &mut tracker,
            dir.path(),
            &record(9, "Sem mídia"),
            quiet(false),
        )
        .await;

        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, Error::DownloadFailed(_)));
        assert!(!tracker.is_downloaded(9));
        assert_eq!(part_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_external_link_is_not_downloadable() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = DownloadStateTracker::open(dir.path()).unwrap();
        let transport = MockTransport::with_messages(vec![]);
        let mut rec = record(5, "Playlist");
        rec.downloadable = false;
        rec.url = Some("https://youtube.com/watch?v=x".into());

        let err = download_content(&transport, &test_channel(), &mut tracker, dir.path(), &rec, quiet(false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("youtube.com"));
    }

    #[tokio::test]
    async fn test_cancelled_download_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = DownloadStateTracker::open(dir.path()).unwrap();
        let transport = StallingTransport;
        let rec = record(8, "Longo");
        let channel = test_channel();

        let download = download_content(&transport, &channel, &mut tracker, dir.path(), &rec, quiet(false));
        let result = tokio::time::timeout(std::time::Duration::from_millis(100), download).await;
        assert!(result.is_err());

        assert_eq!(part_files(dir.path()), 0);
        assert!(!tracker.is_downloaded(8));
        assert!(!dir.path().join("8_Longo.mp4").exists());
    }
}
