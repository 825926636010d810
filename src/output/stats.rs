//! Statistics reporting.

use console::style;

use crate::download::SessionStats;
use crate::scan::ChannelContent;

/// Bytes in human units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Print the outcome of a live scan.
pub fn print_scan_stats(content: &ChannelContent) {
    println!(
        "Scanned {} messages: {} with content ({} skipped)",
        style(content.messages_seen).cyan(),
        style(content.contents.len()).green(),
        style(content.skipped).yellow()
    );
}

/// Print session statistics.
pub fn print_session_stats(stats: &SessionStats) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Session Statistics:").bold());
    println!("  Channels scanned:   {}", stats.channels_scanned);
    println!("  Downloaded:         {}", stats.downloaded);
    println!("  Already downloaded: {}", stats.already_downloaded);
    if stats.failed > 0 {
        println!("  Failed:             {}", style(stats.failed).red());
    }
    if stats.cancelled > 0 {
        println!("  Cancelled:          {}", style(stats.cancelled).yellow());
    }
    println!("  Total size:         {}", format_bytes(stats.bytes_downloaded));
    println!("{}", style("═".repeat(50)).dim());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
