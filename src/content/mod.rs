//! Content extraction module.
//!
//! This module handles:
//! - The message model every transport maps into
//! - Pattern tables for size, duration and attribution
//! - Turning a message into a content record

pub mod extractor;
pub mod message;
pub mod patterns;
pub mod record;

pub use extractor::{extract_content, extract_metadata, TextMetadata};
pub use message::{Media, Message};
pub use record::{ContentKind, ContentRecord};
