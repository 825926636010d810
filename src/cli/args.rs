//! Command-line argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{Config, ScanMode, TransportKind};

/// Telegram channel content indexer CLI.
#[derive(Parser, Debug)]
#[command(
    name = "tg-indexer",
    version,
    about = "Index and download content shared in Telegram channels",
    long_about = "Scans a Telegram channel for attached media and for posts describing content \
                  hosted elsewhere (size, duration, source channel), lists what was found and \
                  downloads the selected items.\n\n\
                  Without --channel an interactive prompt is started."
)]
pub struct Args {
    /// Channel to scan: @username, t.me link or invite link.
    #[arg(long)]
    pub channel: Option<String>,

    /// Items to download without prompting, e.g. "1-3,5" or "all".
    #[arg(long, requires = "channel")]
    pub download: Option<String>,

    /// Download items again even if they were downloaded before.
    #[arg(long)]
    pub force: bool,

    /// Ignore the cached scan and rescan the channel.
    #[arg(long)]
    pub refresh: bool,

    /// Clear the channel cache before starting.
    #[arg(long)]
    pub clear_cache: bool,

    /// Which messages count as content.
    #[arg(long, value_enum)]
    pub mode: Option<ScanModeArg>,

    /// Maximum number of messages to scan.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Hours a cached scan stays fresh.
    #[arg(long = "cache-ttl")]
    pub cache_ttl: Option<u64>,

    /// Read a Telegram Desktop JSON export instead of the web preview.
    #[arg(long, env = "TG_INDEXER_EXPORT")]
    pub export: Option<PathBuf>,

    /// Base URL of the channel web preview.
    #[arg(long = "base-url", env = "TG_INDEXER_BASE_URL")]
    pub base_url: Option<String>,

    /// Base directory for downloads.
    #[arg(short = 'd', long = "directory")]
    pub download_directory: Option<PathBuf>,

    /// Directory for the channel cache.
    #[arg(long = "cache-dir")]
    pub cache_directory: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Don't scan pinned messages separately.
    #[arg(long)]
    pub no_pinned: bool,

    /// Hide progress bars and spinners.
    #[arg(long, short)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

/// CLI scan mode argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScanModeArg {
    /// Only messages carrying media.
    Media,
    /// Posts describing content hosted elsewhere.
    Indexed,
}

impl From<ScanModeArg> for ScanMode {
    fn from(arg: ScanModeArg) -> Self {
        match arg {
            ScanModeArg::Media => ScanMode::Media,
            ScanModeArg::Indexed => ScanMode::Indexed,
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        if let Some(dir) = &self.export {
            config.transport.kind = TransportKind::Export;
            config.transport.export_dir = Some(dir.clone());
        }

        if let Some(base_url) = &self.base_url {
            config.transport.base_url = base_url.clone();
        }

        if let Some(dir) = &self.download_directory {
            config.options.download_directory = dir.clone();
        }

        if let Some(dir) = &self.cache_directory {
            config.options.cache_directory = dir.clone();
        }

        if let Some(mode) = self.mode {
            config.options.scan_mode = mode.into();
        }

        if let Some(limit) = self.limit {
            config.options.scan_limit = limit;
        }

        if let Some(hours) = self.cache_ttl {
            config.options.cache_ttl_hours = hours;
        }

        // Boolean flags (only override if set to non-default)
        if self.no_pinned {
            config.options.include_pinned = false;
        }

        if self.quiet {
            config.options.show_progress = false;
        }
    }
}
