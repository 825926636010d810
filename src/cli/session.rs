//! Interactive and one-shot operator sessions.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use console::style;
use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use crate::cache::CacheStore;
use crate::cli::selection::parse_selection;
use crate::config::{parse_channel_ref, Config};
use crate::download::{
    download_content, DownloadOptions, DownloadOutcome, DownloadStateTracker, SessionStats,
};
use crate::error::{Error, Result};
use crate::output::{
    format_bytes, print_channel_info, print_content_list, print_error, print_info,
    print_scan_stats, print_success, print_warning,
};
use crate::scan::{ChannelContent, ChannelContentService, ScanOptions};
use crate::transport::Transport;

/// Produces a future that resolves when the operator interrupts the current step.
pub type Interrupt = fn() -> BoxFuture<'static, ()>;

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub fn ctrl_c_interrupt() -> BoxFuture<'static, ()> {
    Box::pin(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::debug!("Ctrl-C handler unavailable: {}", e);
            futures::future::pending::<()>().await;
        }
    })
}

/// Run `future` to completion unless `interrupt` resolves first.
async fn interruptible<T>(
    future: impl Future<Output = Result<T>>,
    interrupt: BoxFuture<'static, ()>,
) -> Result<T> {
    tokio::select! {
        result = future => result,
        _ = interrupt => Err(Error::Cancelled),
    }
}

/// Line-based operator prompt.
pub struct Prompt<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    /// Ask a question. `None` on end of input or Ctrl-C.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        print!("{} ", style(question).bold());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = self.lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        Ok(line.map(|l| l.trim().to_string()))
    }

    /// Ask a yes/no question.
    pub async fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let answer = self.ask(&format!("{} {}", question, hint)).await?;
        Ok(match answer.as_deref().map(str::to_lowercase).as_deref() {
            Some("y") | Some("yes") | Some("s") | Some("sim") => true,
            Some("n") | Some("no") | Some("nao") | Some("não") => false,
            _ => default,
        })
    }
}

/// State of one run: scanning channels and downloading from them.
pub struct Session<'a> {
    transport: &'a dyn Transport,
    service: ChannelContentService<'a>,
    tracker: DownloadStateTracker,
    download_dir: PathBuf,
    download_options: DownloadOptions,
    refresh: bool,
    interrupt: Interrupt,
    pub stats: SessionStats,
}

impl<'a> Session<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        cache: &'a dyn CacheStore,
        config: &Config,
        force: bool,
        refresh: bool,
    ) -> Result<Self> {
        let download_dir = config.options.download_directory.clone();
        let tracker = DownloadStateTracker::open(&download_dir)?;

        Ok(Self {
            transport,
            service: ChannelContentService::new(transport, cache, ScanOptions::from_config(config)),
            tracker,
            download_dir,
            download_options: DownloadOptions {
                force,
                show_progress: config.options.show_progress,
            },
            refresh,
            interrupt: ctrl_c_interrupt,
            stats: SessionStats::default(),
        })
    }

    /// Replace the Ctrl-C interrupt source.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Resolve, scan (or read from the cache) and display a channel.
    ///
    /// An operator interrupt abandons the scan with `Error::Cancelled`.
    pub async fn load_channel(&mut self, input: &str) -> Result<ChannelContent> {
        let channel_ref = parse_channel_ref(input)?;
        let interrupt = (self.interrupt)();
        let content =
            interruptible(self.service.fetch(&channel_ref, self.refresh), interrupt).await?;
        self.stats.channels_scanned += 1;

        print_channel_info(&content.channel, content.from_cache);
        if !content.from_cache {
            print_scan_stats(&content);
        }
        Ok(content)
    }

    /// Scan one channel and download a selection without prompting.
    pub async fn run_once(&mut self, channel: &str, selection: Option<&str>) -> Result<()> {
        let content = self.load_channel(channel).await?;
        if content.contents.is_empty() {
            print_warning("No content found in channel");
            return Ok(());
        }
        print_content_list(&content.contents, &self.tracker);

        let Some(selection) = selection else {
            return Ok(());
        };

        let indices = parse_selection(selection, content.contents.len())?;
        self.download_selection::<&[u8]>(&content, &indices, None).await;

        if self.stats.failed > 0 {
            return Err(Error::DownloadFailed(format!(
                "{} item(s) failed",
                self.stats.failed
            )));
        }
        Ok(())
    }

    /// Prompt for channels until `exit` or end of input.
    pub async fn run_interactive<R: AsyncRead + Unpin>(
        &mut self,
        prompt: &mut Prompt<R>,
    ) -> Result<()> {
        loop {
            let Some(input) = prompt
                .ask("\nEnter channel URL or @username (or 'exit' to quit):")
                .await?
            else {
                break;
            };

            if input.eq_ignore_ascii_case("exit") {
                break;
            }
            if input.is_empty() {
                continue;
            }

            let content = match self.load_channel(&input).await {
                Ok(content) => content,
                Err(Error::Cancelled) => {
                    print_warning("Scan cancelled");
                    continue;
                }
                Err(e) => {
                    print_error(&e.to_string());
                    continue;
                }
            };

            if content.contents.is_empty() {
                print_warning("No content found in channel");
                continue;
            }

            if !self.select_and_download(&content, prompt).await? {
                break;
            }
        }

        Ok(())
    }

    /// Selection loop for one channel. Returns `false` when input ended.
    async fn select_and_download<R: AsyncRead + Unpin>(
        &mut self,
        content: &ChannelContent,
        prompt: &mut Prompt<R>,
    ) -> Result<bool> {
        print_content_list(&content.contents, &self.tracker);

        loop {
            let Some(choice) = prompt
                .ask("\nWhat would you like to download? (number, range like 1-3, list, 'all', 0 for none):")
                .await?
            else {
                return Ok(false);
            };

            let indices = match parse_selection(&choice, content.contents.len()) {
                Ok(indices) => indices,
                Err(e) => {
                    print_error(&e.to_string());
                    continue;
                }
            };
            if indices.is_empty() {
                return Ok(true);
            }

            if !self.download_selection(content, &indices, Some(&mut *prompt)).await {
                return Ok(true);
            }

            if !prompt.confirm("Download more?", false).await? {
                return Ok(true);
            }
        }
    }

    /// Download the selected items one at a time.
    ///
    /// Returns `false` if the operator cancelled a transfer.
    async fn download_selection<R: AsyncRead + Unpin>(
        &mut self,
        content: &ChannelContent,
        indices: &[usize],
        mut prompt: Option<&mut Prompt<R>>,
    ) -> bool {
        for &index in indices {
            let Some(record) = content.contents.get(index - 1) else {
                continue;
            };

            let mut options = self.download_options;
            if !options.force && self.tracker.existing_path(record.id).is_some() {
                if let Some(prompt) = prompt.as_deref_mut() {
                    let again = prompt
                        .confirm(
                            &format!("Content {} was already downloaded. Download again?", index),
                            false,
                        )
                        .await
                        .unwrap_or(false);
                    if !again {
                        self.stats.already_downloaded += 1;
                        continue;
                    }
                    options.force = true;
                }
            }

            print_info(&format!("Downloading {}...", record.display_title()));

            let interrupt = (self.interrupt)();
            let result = interruptible(
                download_content(
                    self.transport,
                    &content.channel,
                    &mut self.tracker,
                    &self.download_dir,
                    record,
                    options,
                ),
                interrupt,
            )
            .await;

            match result {
                Ok(DownloadOutcome::Downloaded { path, bytes }) => {
                    self.stats.record_download(bytes);
                    print_success(&format!(
                        "Download complete: {} ({})",
                        path.display(),
                        format_bytes(bytes)
                    ));
                }
                Ok(DownloadOutcome::AlreadyDownloaded(path)) => {
                    self.stats.already_downloaded += 1;
                    print_info(&format!("Already downloaded: {}", path.display()));
                }
                Err(Error::Cancelled) => {
                    self.stats.cancelled += 1;
                    print_warning("Download cancelled");
                    return false;
                }
                Err(e) => {
                    self.stats.failed += 1;
                    print_error(&format!("Download failed: {}", e));
                }
            }
        }

        true
    }
}
