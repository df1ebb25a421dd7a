//! The rendered document model.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{frontmatter::Frontmatter, slug::safe_slug};

/// Title used when front matter does not provide one.
pub const UNTITLED: &str = "Untitled";

/// Heading outline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingEntry {
    /// Heading level (1-6).
    pub level: u8,

    /// Visible heading text.
    pub text: String,

    /// Anchor ID emitted on the heading element.
    pub id: String,
}

/// Visibility and ordering flags from front matter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentFlags {
    pub draft: bool,
    pub hide: bool,
    pub pin: bool,
}

/// Outcome of rendering a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStatus {
    #[default]
    Ok,
    /// Rendering failed and the document carries a diagnostic body.
    RecoveredError,
}

/// One rendered source file.
///
/// Exactly one `Document` exists per scanned source file, whether or not it
/// rendered successfully. Documents are not mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Path-safe slug used under `/posts/`.
    pub slug: String,
    pub title: String,
    pub date: DateTime<Utc>,
    /// Rendered HTML body.
    pub html: String,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    /// Tags in front matter order, without duplicates.
    pub tags: Vec<String>,
    pub flags: DocumentFlags,
    pub outline: Vec<HeadingEntry>,
    pub status: RenderStatus,
    pub source_path: PathBuf,
    /// Position of the source file in scan order.
    pub order: usize,
}

impl Document {
    /// Assemble a successfully rendered document.
    pub fn from_parts(
        frontmatter: Frontmatter,
        source_path: PathBuf,
        order: usize,
        html: String,
        outline: Vec<HeadingEntry>,
    ) -> Self {
        let slug = frontmatter
            .abbrlink
            .as_deref()
            .map(safe_slug)
            .unwrap_or_else(|| slug_for_path(&source_path));

        Self {
            slug,
            title: frontmatter.title.unwrap_or_else(|| UNTITLED.to_string()),
            date: frontmatter.date.unwrap_or_else(Utc::now),
            html,
            excerpt: frontmatter.excerpt,
            image: frontmatter.image,
            category: frontmatter.category,
            tags: frontmatter.tags,
            flags: DocumentFlags {
                draft: frontmatter.draft,
                hide: frontmatter.hide,
                pin: frontmatter.pin,
            },
            outline,
            status: RenderStatus::Ok,
            source_path,
            order,
        }
    }

    /// Document for a source that failed to render.
    ///
    /// It is forced to draft so it never reaches public listings, and its body
    /// shows the error next to the escaped raw source.
    pub fn recovered(source_path: PathBuf, order: usize, error: &str, raw_body: &str) -> Self {
        let html = format!(
            "<div class=\"render-error\"><p>Error rendering content: {}</p><pre>{}</pre></div>",
            escape_html(error),
            escape_html(raw_body)
        );
        Self::diagnostic(source_path, order, html)
    }

    /// Placeholder for a task whose worker crashed before producing a document.
    pub fn placeholder(source_path: PathBuf, order: usize, reason: &str) -> Self {
        let html = format!(
            "<div class=\"render-error\"><p>Build error: {}</p></div>",
            escape_html(reason)
        );
        let mut doc = Self::diagnostic(source_path, order, html);
        doc.title = "Build Error".to_string();
        doc
    }

    fn diagnostic(source_path: PathBuf, order: usize, html: String) -> Self {
        Self {
            slug: slug_for_path(&source_path),
            title: format!("Error: {}", file_stem(&source_path)),
            date: Utc::now(),
            html,
            excerpt: None,
            image: None,
            category: None,
            tags: Vec::new(),
            flags: DocumentFlags {
                draft: true,
                ..DocumentFlags::default()
            },
            outline: Vec::new(),
            status: RenderStatus::RecoveredError,
            source_path,
            order,
        }
    }

    /// Whether the document appears in listings, feeds and the sitemap.
    pub fn is_public(&self) -> bool {
        !self.flags.draft && !self.flags.hide
    }

    /// Whether rendering failed.
    pub fn is_recovered(&self) -> bool {
        self.status == RenderStatus::RecoveredError
    }

    /// Site-relative URL of the post page.
    pub fn url(&self) -> String {
        format!("/posts/{}", self.slug)
    }

    /// Explicit excerpt, or a truncated plain-text prefix of the content.
    pub fn summary(&self, max_chars: usize) -> String {
        match &self.excerpt {
            Some(excerpt) => excerpt.clone(),
            None => truncate_at_word_boundary(strip_html(&self.html).trim(), max_chars),
        }
    }

    /// Character count of the tag-stripped content.
    pub fn char_count(&self) -> usize {
        strip_html(&self.html).chars().count()
    }
}

fn file_stem(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn slug_for_path(path: &std::path::Path) -> String {
    safe_slug(&file_stem(path))
}

/// Strip HTML tags from content and decode the entities the renderer emits.
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    decode_entities(&result)
}

/// Reverse of [`escape_html`]. `&amp;` goes last so `&amp;lt;` stays `&lt;`.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Truncate text at word boundary, respecting UTF-8 character boundaries.
pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text.to_string();
    }

    let truncate_byte_idx = text
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());

    let truncated = &text[..truncate_byte_idx];

    if let Some(last_space_byte) = truncated.rfind(' ') {
        format!("{}...", &truncated[..last_space_byte])
    } else {
        format!("{truncated}...")
    }
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn frontmatter(title: &str) -> Frontmatter {
        Frontmatter {
            title: Some(title.to_string()),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
            ..Frontmatter::default()
        }
    }

    #[test]
    fn test_slug_prefers_abbrlink() {
        let mut fm = frontmatter("Hello");
        fm.abbrlink = Some("a1b2".to_string());
        let doc = Document::from_parts(fm, PathBuf::from("posts/hello.md"), 0, String::new(), vec![]);
        assert_eq!(doc.slug, "a1b2");
        assert_eq!(doc.url(), "/posts/a1b2");
    }

    #[test]
    fn test_slug_from_file_stem() {
        let doc = Document::from_parts(
            frontmatter("Hello"),
            PathBuf::from("posts/你好.md"),
            0,
            String::new(),
            vec![],
        );
        assert_eq!(doc.slug, "e4bda0e5a5bd");
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let doc = Document::from_parts(
            Frontmatter::default(),
            PathBuf::from("a.md"),
            3,
            String::new(),
            vec![],
        );
        assert_eq!(doc.title, UNTITLED);
        assert_eq!(doc.order, 3);
        assert!(doc.is_public());
        assert!(!doc.is_recovered());
    }

    #[test]
    fn test_recovered_document_is_draft_with_marker() {
        let doc = Document::recovered(PathBuf::from("bad.md"), 1, "boom", "<b>raw</b>");
        assert!(doc.flags.draft);
        assert!(!doc.is_public());
        assert!(doc.is_recovered());
        assert!(doc.html.contains("render-error"));
        assert!(doc.html.contains("&lt;b&gt;raw&lt;/b&gt;"));
        assert_eq!(doc.title, "Error: bad");
    }

    #[test]
    fn test_placeholder_document() {
        let doc = Document::placeholder(PathBuf::from("crash.md"), 2, "worker panicked");
        assert_eq!(doc.title, "Build Error");
        assert!(doc.is_recovered());
        assert!(doc.flags.draft);
        assert!(doc.html.contains("worker panicked"));
    }

    #[test]
    fn test_summary_falls_back_to_content() {
        let mut doc = Document::from_parts(
            frontmatter("T"),
            PathBuf::from("t.md"),
            0,
            "<p>Hello <em>brave</em> new world</p>".to_string(),
            vec![],
        );
        assert_eq!(doc.summary(200), "Hello brave new world");
        assert_eq!(doc.summary(12), "Hello brave...");
        assert_eq!(doc.char_count(), 21);

        doc.excerpt = Some("Explicit".to_string());
        assert_eq!(doc.summary(3), "Explicit");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Hello <strong>World</strong></p>"),
            "Hello World"
        );
        assert_eq!(strip_html("No tags here"), "No tags here");
        assert_eq!(
            strip_html("<p>Tom &amp; &quot;Jerry&quot; &lt;3</p>"),
            "Tom & \"Jerry\" <3"
        );
        assert_eq!(strip_html("<code>&amp;lt;</code>"), "&lt;");
    }

    #[test]
    fn test_char_count_ignores_entities() {
        let doc = Document::from_parts(
            frontmatter("Entities"),
            PathBuf::from("entities.md"),
            0,
            "<p>a &amp; &quot;b&quot;</p>".to_string(),
            Vec::new(),
        );
        assert_eq!(doc.char_count(), 7);
        assert_eq!(doc.summary(200), "a & \"b\"");
    }

    #[test]
    fn test_truncate_at_word_boundary() {
        let text = "Hello world this is a test";
        assert_eq!(truncate_at_word_boundary(text, 100), text);
        assert_eq!(truncate_at_word_boundary(text, 11), "Hello...");
        assert_eq!(truncate_at_word_boundary(text, 12), "Hello world...");

        let chinese_text = "你好世界 Hello World";
        assert_eq!(truncate_at_word_boundary(chinese_text, 7), "你好世界...");
    }
}
