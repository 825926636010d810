//! Error types for the tg-indexer application.

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Channel unreachable: {0}")]
    ChannelUnreachable(String),

    #[error("Message fetch failed: {0}")]
    MessageFetch(String),

    /// A single message could not be turned into a [`Message`](crate::content::Message).
    #[error("Skipped message{}: {reason}", describe_id(.message_id))]
    ExtractionSkip {
        message_id: Option<i64>,
        reason: String,
    },

    // Download errors
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Cancelled by operator")]
    Cancelled,

    // Cache errors
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    // Operator input errors
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    // File system errors
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

fn describe_id(id: &Option<i64>) -> String {
    id.map(|id| format!(" {}", id)).unwrap_or_default()
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const TRANSPORT_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
}
