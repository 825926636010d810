//! Command-line interface.
//!
//! Provides:
//! - Argument parsing and config overrides
//! - Item selection parsing
//! - The interactive and one-shot sessions

pub mod args;
pub mod selection;
pub mod session;

pub use args::Args;
pub use selection::parse_selection;
pub use session::{Prompt, Session};
