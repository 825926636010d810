//! Bounded channel scan.

use std::collections::HashSet;

use futures::StreamExt;

use crate::config::{Config, ScanMode};
use crate::content::{extract_content, ContentRecord, Message};
use crate::error::{Error, Result};
use crate::output::progress::create_spinner;
use crate::transport::{Channel, Transport};

/// Messages between progress log lines.
const PROGRESS_INTERVAL: usize = 100;

/// Options for a single scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub limit: usize,
    pub mode: ScanMode,
    pub include_pinned: bool,
    pub show_progress: bool,
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            limit: config.options.scan_limit,
            mode: config.options.scan_mode,
            include_pinned: config.options.include_pinned,
            show_progress: config.options.show_progress,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of scanning a channel.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Unique records, newest first.
    pub records: Vec<ContentRecord>,
    /// Messages received from the transport, skipped ones included.
    pub messages_seen: usize,
    /// Messages that could not be mapped and were skipped.
    pub skipped: usize,
}

/// Collects records, keeping the first occurrence of each message ID.
#[derive(Default)]
struct Collector {
    seen_ids: HashSet<i64>,
    records: Vec<ContentRecord>,
}

impl Collector {
    fn push(&mut self, message: &Message, mode: ScanMode) {
        if let Some(record) = extract_content(message, mode) {
            if self.seen_ids.insert(record.id) {
                self.records.push(record);
            }
        }
    }

    fn into_sorted(mut self) -> Vec<ContentRecord> {
        // Stable: equal dates keep transport order.
        self.records.sort_by(|a, b| b.date.cmp(&a.date));
        self.records
    }
}

/// Scan up to `options.limit` messages of a channel for content.
///
/// Messages the transport could not map are logged and skipped. A fetch
/// failure before any message arrived is returned as an error; a later one
/// ends the scan with what was collected so far.
pub async fn scan_channel(
    transport: &dyn Transport,
    channel: &Channel,
    options: &ScanOptions,
) -> Result<ScanReport> {
    tracing::info!(
        "Scanning {} (limit {}, {} mode)",
        channel.title,
        options.limit,
        options.mode
    );

    let spinner = create_spinner(&format!("Scanning {}...", channel.title), options.show_progress);
    let mut collector = Collector::default();
    let mut messages_seen = 0usize;
    let mut skipped = 0usize;

    let mut messages = transport.iter_messages(channel, options.limit);
    while let Some(item) = messages.next().await {
        match item {
            Ok(message) => {
                messages_seen += 1;
                collector.push(&message, options.mode);
            }
            Err(Error::ExtractionSkip { message_id, reason }) => {
                messages_seen += 1;
                skipped += 1;
                tracing::warn!(
                    "Skipping message {}: {}",
                    message_id.map(|id| id.to_string()).unwrap_or_else(|| "?".into()),
                    reason
                );
            }
            Err(e) if messages_seen == 0 => {
                spinner.finish_and_clear();
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    "Scan of {} stopped after {} messages: {}",
                    channel.title,
                    messages_seen,
                    e
                );
                break;
            }
        }

        if messages_seen > 0 && messages_seen % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Processed {} messages, {} with content",
                messages_seen,
                collector.records.len()
            );
        }
        spinner.set_message(format!(
            "Scanning {}... {} messages, {} found",
            channel.title,
            messages_seen,
            collector.records.len()
        ));
    }
    drop(messages);

    if options.include_pinned {
        match transport.pinned_messages(channel).await {
            Ok(pinned) => {
                tracing::debug!("Checking {} pinned message(s)", pinned.len());
                for message in &pinned {
                    collector.push(message, options.mode);
                }
            }
            Err(e) => tracing::warn!("Could not fetch pinned messages: {}", e),
        }
    }

    spinner.finish_and_clear();

    let records = collector.into_sorted();
    tracing::info!(
        "Scan of {} complete: {} messages, {} with content, {} skipped",
        channel.title,
        messages_seen,
        records.len(),
        skipped
    );

    Ok(ScanReport {
        records,
        messages_seen,
        skipped,
    })
}
