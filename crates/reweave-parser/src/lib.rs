//! ReWeave Parser Library
//!
//! Markdown to HTML rendering with a heading outline collected in the same pass.

pub mod markdown;
pub mod syntax;

pub use markdown::{MarkdownError, MarkdownRenderer, ParsedContent};
pub use syntax::SyntaxHighlighter;
