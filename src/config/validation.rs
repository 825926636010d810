//! Configuration validation logic.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::loader::Config;
use crate::config::modes::TransportKind;
use crate::error::{Error, Result};
use crate::transport::ChannelRef;

/// Maximum messages a single scan may inspect.
const MAX_SCAN_LIMIT: usize = 10_000;

/// Longest accepted cache freshness window: one year.
pub const MAX_CACHE_TTL_HOURS: u64 = 24 * 366;

/// Channel username: 4-32 chars, alphanumeric and underscores.
static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{4,32}$").unwrap());

/// Invite hash as it appears after `t.me/+` or `t.me/joinchat/`.
static INVITE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{8,64}$").unwrap());

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_cache_ttl(config.options.cache_ttl_hours)?;
    validate_scan_limit(config.options.scan_limit)?;
    validate_transport(config)?;

    Ok(())
}

/// Validate the cache freshness window.
pub fn validate_cache_ttl(hours: u64) -> Result<()> {
    if hours == 0 || hours > MAX_CACHE_TTL_HOURS {
        return Err(Error::ConfigValidation {
            field: "cache_ttl_hours".to_string(),
            message: format!(
                "Cache TTL must be between 1 and {} hours (got {})",
                MAX_CACHE_TTL_HOURS, hours
            ),
        });
    }

    Ok(())
}

/// Validate the per-scan message bound.
pub fn validate_scan_limit(limit: usize) -> Result<()> {
    if limit == 0 || limit > MAX_SCAN_LIMIT {
        return Err(Error::ConfigValidation {
            field: "scan_limit".to_string(),
            message: format!(
                "Scan limit must be between 1 and {} (got {})",
                MAX_SCAN_LIMIT, limit
            ),
        });
    }

    Ok(())
}

/// Validate transport settings for the selected kind.
pub fn validate_transport(config: &Config) -> Result<()> {
    let transport = &config.transport;

    if transport.page_delay_min_ms > transport.page_delay_max_ms {
        return Err(Error::ConfigValidation {
            field: "page_delay_min_ms".to_string(),
            message: format!(
                "Minimum page delay ({}) exceeds maximum ({})",
                transport.page_delay_min_ms, transport.page_delay_max_ms
            ),
        });
    }

    match transport.kind {
        TransportKind::Web => {
            let url = url::Url::parse(&transport.base_url)?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::ConfigValidation {
                    field: "base_url".to_string(),
                    message: format!("Unsupported scheme: {}", url.scheme()),
                });
            }
        }
        TransportKind::Export => {
            let dir = transport.export_dir.as_ref().ok_or_else(|| {
                Error::MissingConfig("export_dir (required for the export transport)".to_string())
            })?;
            if !dir.is_dir() {
                return Err(Error::ConfigValidation {
                    field: "export_dir".to_string(),
                    message: format!("Not a directory: {}", dir.display()),
                });
            }
        }
    }

    Ok(())
}

/// Parse a channel URL, invite link or `@username` into a [`ChannelRef`].
pub fn parse_channel_ref(input: &str) -> Result<ChannelRef> {
    let input = input.trim();

    if input.is_empty() {
        return Err(Error::ConfigValidation {
            field: "channel".to_string(),
            message: "Channel identifier cannot be empty".to_string(),
        });
    }

    // Private channel invite links
    let invite = input
        .split_once("/+")
        .or_else(|| input.split_once("/joinchat/"))
        .map(|(_, rest)| rest.split(['/', '?']).next().unwrap_or("").trim());

    if let Some(hash) = invite {
        if INVITE_PATTERN.is_match(hash) {
            return Ok(ChannelRef::Invite {
                hash: hash.to_string(),
            });
        }
        return Err(Error::ConfigValidation {
            field: "channel".to_string(),
            message: format!("Invalid invite link: {}", input),
        });
    }

    if input.starts_with('+') {
        return Err(Error::ConfigValidation {
            field: "channel".to_string(),
            message: "Invalid invite link. Use the full t.me/+HASH format".to_string(),
        });
    }

    let username = if input.contains("t.me/") || input.contains("telegram.me/") {
        username_from_link(input)
    } else {
        input.trim_start_matches('@').to_string()
    };

    if !USERNAME_PATTERN.is_match(&username) {
        return Err(Error::ConfigValidation {
            field: "channel".to_string(),
            message: format!(
                "'{}' is not a valid channel username. Use @name, a t.me link or an invite link.",
                input
            ),
        });
    }

    Ok(ChannelRef::Public { username })
}

/// First path segment of a `t.me` link, skipping the `/s/` preview prefix.
fn username_from_link(input: &str) -> String {
    let path = input
        .split_once(".me/")
        .map(|(_, path)| path)
        .unwrap_or(input);

    path.split(['/', '?', '#'])
        .filter(|segment| !segment.is_empty())
        .find(|segment| *segment != "s")
        .unwrap_or("")
        .trim_start_matches('@')
        .to_string()
}
