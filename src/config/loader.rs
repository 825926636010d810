//! Configuration structures and loading logic.

use crate::config::modes::{ScanMode, TransportKind};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub options: OptionsConfig,
}

/// Message source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport kind (web, export).
    #[serde(default)]
    pub kind: TransportKind,

    /// Base URL of the channel web preview.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory holding a Telegram Desktop JSON export.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    /// Minimum delay between page requests, in milliseconds.
    #[serde(default = "default_page_delay_min")]
    pub page_delay_min_ms: u64,

    /// Maximum delay between page requests, in milliseconds.
    #[serde(default = "default_page_delay_max")]
    pub page_delay_max_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            base_url: default_base_url(),
            export_dir: None,
            page_delay_min_ms: default_page_delay_min(),
            page_delay_max_ms: default_page_delay_max(),
        }
    }
}

/// Scan, cache and download options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Directory downloads and the download state live in.
    #[serde(default = "default_download_directory")]
    pub download_directory: PathBuf,

    /// Directory the channel cache lives in.
    #[serde(default = "default_cache_directory")]
    pub cache_directory: PathBuf,

    /// Hours a cached channel scan stays fresh.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    /// Maximum number of messages inspected per scan.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,

    /// Which messages count as content.
    #[serde(default)]
    pub scan_mode: ScanMode,

    /// Whether pinned messages are scanned as well.
    #[serde(default = "default_true")]
    pub include_pinned: bool,

    /// Whether to show progress bars and spinners.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            download_directory: default_download_directory(),
            cache_directory: default_cache_directory(),
            cache_ttl_hours: default_cache_ttl_hours(),
            scan_limit: default_scan_limit(),
            scan_mode: ScanMode::default(),
            include_pinned: true,
            show_progress: true,
        }
    }
}

fn default_base_url() -> String {
    "https://t.me".to_string()
}

fn default_page_delay_min() -> u64 {
    800
}

fn default_page_delay_max() -> u64 {
    1600
}

fn default_download_directory() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from("cache")
}

fn default_cache_ttl_hours() -> u64 {
    8
}

fn default_scan_limit() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one from config.example.toml",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Freshness window of cached channel scans.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.options.cache_ttl_hours.saturating_mul(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.transport.kind, TransportKind::Web);
        assert_eq!(config.transport.base_url, "https://t.me");
        assert_eq!(config.options.cache_ttl_hours, 8);
        assert_eq!(config.options.scan_limit, 1000);
        assert_eq!(config.options.scan_mode, ScanMode::Media);
        assert!(config.options.include_pinned);
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            [transport]
            kind = "export"
            export_dir = "/data/export"

            [options]
            scan_mode = "indexed"
            cache_ttl_hours = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.transport.kind, TransportKind::Export);
        assert_eq!(
            config.transport.export_dir,
            Some(PathBuf::from("/data/export"))
        );
        assert_eq!(config.options.scan_mode, ScanMode::Indexed);
        assert_eq!(config.cache_ttl(), Duration::from_secs(3 * 3600));
        assert_eq!(config.options.download_directory, PathBuf::from("downloads"));
    }

    #[test]
    fn test_cache_ttl_saturates() {
        let mut config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(8 * 3600));

        config.options.cache_ttl_hours = u64::MAX / 1000;
        assert_eq!(config.cache_ttl(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.options.scan_limit = 250;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.options.scan_limit, 250);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
