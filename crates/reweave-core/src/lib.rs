//! ReWeave Core Library
//!
//! Document model, front matter parsing, slug encoding and site configuration
//! shared by the ReWeave build pipeline.

pub mod config;
pub mod document;
pub mod error;
pub mod frontmatter;
pub mod slug;

pub use config::{Config, Theme};
pub use document::{
    Document, DocumentFlags, HeadingEntry, RenderStatus, escape_html, strip_html,
    truncate_at_word_boundary,
};
pub use error::{CoreError, Result};
pub use frontmatter::Frontmatter;
pub use slug::{decode_hex, safe_slug};
