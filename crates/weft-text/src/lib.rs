//! Weft Text
//!
//! Plain-text collaborators for Weft processors:
//!
//! - **text_parse**: paragraphs separated by blank lines → `root` / `paragraph` / `text`
//! - **text_stringify**: paragraphs joined by a blank line
//! - **uppercase**, **trim**: synchronous transforms
//! - **word_count**: asynchronous transform writing `file.data["wordCount"]`
//! - **annotate**: callback transform adding a file message

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod plugins;
pub mod syntax;

pub use plugins::{annotate, text_parse, text_stringify, trim, uppercase, word_count, WORD_COUNT_KEY};

use weft_preset::PluginCatalog;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Catalog with every built-in plugin under its name
#[must_use]
pub fn catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with("text_parse", text_parse())
        .with("text_stringify", text_stringify())
        .with("uppercase", uppercase())
        .with("trim", trim())
        .with("word_count", word_count())
        .with("annotate", annotate())
}
