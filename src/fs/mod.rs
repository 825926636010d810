//! Filesystem module.
//!
//! Provides:
//! - Path and directory management
//! - Download filename generation

pub mod naming;
pub mod paths;

pub use naming::{clean_title, content_filename, make_unique_filename, sanitize_filename};
pub use paths::{clean_part_files, ensure_dir, part_path};
