//! Configuration module for the tg-indexer.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Scan and transport modes
//! - Configuration and channel identifier validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{Config, OptionsConfig, TransportConfig};
pub use modes::{ScanMode, TransportKind};
pub use validation::{parse_channel_ref, validate_config};
