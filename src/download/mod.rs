//! Download module for content downloading.
//!
//! This module provides:
//! - Download state tracking
//! - Content downloading with partial-file cleanup

pub mod content;
pub mod state;

pub use content::{download_content, DownloadOptions, DownloadOutcome};
pub use state::{DownloadStateTracker, SessionStats};
