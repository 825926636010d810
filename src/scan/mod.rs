//! Channel scanning module.
//!
//! This module provides:
//! - A bounded scan of a channel's messages into content records
//! - The cached channel content service used by the CLI

pub mod scanner;
pub mod service;

pub use scanner::{scan_channel, ScanOptions, ScanReport};
pub use service::{ChannelContent, ChannelContentService};
