//! Console output utilities.

use console::style;

use crate::content::{ContentKind, ContentRecord};
use crate::download::DownloadStateTracker;
use crate::transport::Channel;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     tg-indexer                                        ║
║     Index and download content from Telegram channels ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print configuration summary.
pub fn print_config_summary(transport: &str, scan_mode: &str, download_dir: &str) {
    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Transport: {}", transport);
    println!("  Mode: {}", scan_mode);
    println!("  Directory: {}", download_dir);
    println!();
}

/// Print what is known about a channel.
pub fn print_channel_info(channel: &Channel, from_cache: bool) {
    println!();
    println!("{}", style(&channel.title).bold());
    if let Some(username) = &channel.username {
        println!("  Username: @{}", username);
    }
    if let Some(members) = channel.members_count {
        println!("  Members:  {}", members);
    }
    println!(
        "  Type:     {}",
        if channel.is_private { "private" } else { "public" }
    );
    if let Some(description) = &channel.description {
        let first_line = description.lines().next().unwrap_or_default();
        println!("  About:    {}", style(first_line).dim());
    }
    if from_cache {
        println!("  {}", style("(cached scan, use --refresh to rescan)").dim());
    }
}

/// Metadata summary shown under a record's title.
pub fn record_meta(record: &ContentRecord) -> String {
    let mut meta = Vec::new();
    if let Some(size) = &record.size {
        meta.push(format!("size {}", size));
    }
    if let Some(duration) = &record.duration {
        meta.push(format!("duration {}", duration));
    }
    if let Some(indexed_by) = &record.indexed_by {
        meta.push(format!("@{}", indexed_by));
    }
    if record.kind != ContentKind::Text {
        meta.push(record.kind.to_string());
    }
    if let Some(url) = &record.url {
        meta.push(url.clone());
    }
    meta.join(" | ")
}

/// Print the numbered content list, marking downloaded items.
const DOWNLOADED_MARKER: &str = "↺";
const DOWNLOADABLE_MARKER: &str = "↓";
const LINK_MARKER: &str = "·";

/// List marker for a record. Only files still on disk count as downloaded.
fn status_marker(record: &ContentRecord, tracker: &DownloadStateTracker) -> &'static str {
    if tracker.existing_path(record.id).is_some() {
        DOWNLOADED_MARKER
    } else if record.downloadable {
        DOWNLOADABLE_MARKER
    } else {
        LINK_MARKER
    }
}

pub fn print_content_list(records: &[ContentRecord], tracker: &DownloadStateTracker) {
    println!();
    println!(
        "{}",
        style(format!("Found {} item(s)", records.len())).green()
    );

    for (index, record) in records.iter().enumerate() {
        let marker = status_marker(record, tracker);
        let status = match marker {
            DOWNLOADED_MARKER => style(marker).blue(),
            DOWNLOADABLE_MARKER => style(marker).green(),
            _ => style(marker).dim(),
        };

        println!(
            "{} [{}] {} {}",
            status,
            index + 1,
            record.display_title(),
            style(record.date.format("%Y-%m-%d")).dim()
        );

        let meta = record_meta(record);
        if !meta.is_empty() {
            println!("    {}", style(meta).dim());
        }
    }
}
