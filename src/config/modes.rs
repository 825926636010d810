//! Scan and transport mode definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which messages count as content during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Only messages carrying media (default).
    #[default]
    Media,
    /// Messages describing content hosted elsewhere, media or not.
    Indexed,
}

impl ScanMode {
    /// Whether a message must carry media to produce a record.
    pub fn require_media(&self) -> bool {
        matches!(self, ScanMode::Media)
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Media => write!(f, "media"),
            ScanMode::Indexed => write!(f, "indexed"),
        }
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "media" => Ok(ScanMode::Media),
            "indexed" => Ok(ScanMode::Indexed),
            _ => Err(format!("Unknown scan mode: {}", s)),
        }
    }
}

/// Where channel messages come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Public channel web preview (default).
    #[default]
    Web,
    /// A Telegram Desktop JSON export on disk.
    Export,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Web => write!(f, "web"),
            TransportKind::Export => write!(f, "export"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "web" => Ok(TransportKind::Web),
            "export" => Ok(TransportKind::Export),
            _ => Err(format!("Unknown transport: {}", s)),
        }
    }
}
