//! tg-indexer - Telegram channel content indexer and downloader
//!
//! This library scans Telegram channels for content: attached media, and
//! posts describing content hosted elsewhere (size, duration, the channel
//! that indexed it). Found items can be downloaded to local storage.
//!
//! # Features
//!
//! - Heuristic metadata extraction from Portuguese/English posts
//! - Media-only or indexed-content scan modes
//! - Public web preview and Telegram Desktop export transports
//! - Channel scan cache with a freshness window
//! - Download tracking with partial-file cleanup
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use tg_indexer::{
//!     cache::FileCache, config::parse_channel_ref, scan::ChannelContentService,
//!     scan::ScanOptions, transport::WebTransport, Config,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let transport = WebTransport::new(&config.transport)?;
//!     let cache = FileCache::open(&config.options.cache_directory, config.cache_ttl())?;
//!     let service =
//!         ChannelContentService::new(&transport, &cache, ScanOptions::from_config(&config));
//!
//!     let content = service
//!         .get_channel_content(&parse_channel_ref("@some_channel")?)
//!         .await?;
//!     for record in &content.contents {
//!         println!("{} {:?}", record.display_title(), record.size);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod content;
pub mod download;
pub mod error;
pub mod fs;
pub mod output;
pub mod scan;
pub mod timestamp;
pub mod transport;

// Re-exports for convenience
pub use config::{Config, ScanMode};
pub use content::{extract_content, ContentRecord, Media, Message};
pub use download::{download_content, DownloadStateTracker};
pub use error::{Error, Result};
pub use scan::{scan_channel, ChannelContent, ChannelContentService};
pub use transport::{Channel, ChannelRef, Transport};
