//! Sitemap generation.
//!
//! Lists the fixed top-level routes followed by every public document.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use reweave_core::{Config, Document};
use thiserror::Error;
use tracing::debug;

use crate::index::ContentIndex;

/// Sitemap generation errors.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sitemap operations.
pub type Result<T> = std::result::Result<T, SitemapError>;

/// Change frequency for sitemap entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFreq {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFreq {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// A sitemap URL entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapUrl {
    /// Absolute URL.
    pub loc: String,

    /// Last modification date.
    pub lastmod: Option<DateTime<Utc>>,

    pub changefreq: ChangeFreq,

    /// Priority (0.0 to 1.0).
    pub priority: f32,
}

/// Sitemap generator.
#[derive(Debug)]
pub struct SitemapGenerator<'a> {
    config: &'a Config,
}

impl<'a> SitemapGenerator<'a> {
    /// Create a new sitemap generator.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// All entries in output order.
    pub fn urls(&self, index: &ContentIndex) -> Vec<SitemapUrl> {
        let mut urls = vec![self.static_url("/", ChangeFreq::Daily, 1.0)];

        for route in ["/archive", "/categories", "/tags"] {
            urls.push(self.static_url(route, ChangeFreq::Weekly, 0.8));
        }

        if self.config.pages.about.is_some() {
            urls.push(self.static_url("/about", ChangeFreq::Monthly, 0.7));
        }
        if self.config.pages.projects.is_some() {
            urls.push(self.static_url("/projects", ChangeFreq::Monthly, 0.7));
        }

        urls.extend(index.ordered().iter().map(|doc| self.document_url(doc)));
        urls
    }

    /// Generate sitemap XML from the index.
    pub fn generate(&self, index: &ContentIndex) -> String {
        let urls = self.urls(index);
        debug!(count = urls.len(), "generating sitemap");

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');

        for url in &urls {
            xml.push_str(&url_to_xml(url));
        }

        xml.push_str("</urlset>\n");
        xml
    }

    /// Write sitemap to a writer.
    pub fn write_to<W: Write>(&self, index: &ContentIndex, writer: &mut W) -> Result<()> {
        let xml = self.generate(index);
        writer.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn static_url(&self, route: &str, changefreq: ChangeFreq, priority: f32) -> SitemapUrl {
        SitemapUrl {
            loc: self.config.url_for(route),
            lastmod: None,
            changefreq,
            priority,
        }
    }

    fn document_url(&self, doc: &Document) -> SitemapUrl {
        SitemapUrl {
            loc: self.config.url_for(&doc.url()),
            lastmod: Some(doc.date),
            changefreq: ChangeFreq::Monthly,
            priority: 0.6,
        }
    }
}

fn url_to_xml(url: &SitemapUrl) -> String {
    let mut xml = String::from("  <url>\n");

    xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&url.loc)));

    if let Some(lastmod) = &url.lastmod {
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            lastmod.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }

    xml.push_str(&format!(
        "    <changefreq>{}</changefreq>\n",
        url.changefreq.as_str()
    ));
    xml.push_str(&format!("    <priority>{:.1}</priority>\n", url.priority));

    xml.push_str("  </url>\n");
    xml
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;
    use reweave_core::{Frontmatter, config::PageConfig};

    use super::*;

    fn test_doc(order: usize, name: &str, day: u32) -> Document {
        let fm = Frontmatter {
            title: Some(name.to_string()),
            date: Utc.with_ymd_and_hms(2024, 2, day, 8, 30, 0).single(),
            ..Frontmatter::default()
        };
        Document::from_parts(fm, PathBuf::from(format!("{name}.md")), order, String::new(), vec![])
    }

    fn test_index() -> ContentIndex {
        let mut draft = test_doc(2, "draft", 3);
        draft.flags.draft = true;
        ContentIndex::build(vec![test_doc(0, "older", 1), test_doc(1, "newer", 2), draft], 10)
    }

    #[test]
    fn test_generate_sitemap() {
        let config = Config::new("Test", "https://example.com");
        let xml = SitemapGenerator::new(&config).generate(&test_index());

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<loc>https://example.com/archive</loc>"));
        assert!(xml.contains("<loc>https://example.com/posts/newer</loc>"));
        assert!(xml.contains("<lastmod>2024-02-02T08:30:00Z</lastmod>"));
        assert!(!xml.contains("/posts/draft"));
        assert!(!xml.contains("/about"));
    }

    #[test]
    fn test_static_routes_and_priorities() {
        let mut config = Config::new("Test", "https://example.com");
        config.pages.about = Some(PageConfig {
            file: "about.md".to_string(),
            title: "About".to_string(),
        });

        let urls = SitemapGenerator::new(&config).urls(&test_index());
        let summary: Vec<_> = urls
            .iter()
            .map(|u| (u.loc.trim_start_matches("https://example.com"), u.changefreq, u.priority))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("/", ChangeFreq::Daily, 1.0),
                ("/archive", ChangeFreq::Weekly, 0.8),
                ("/categories", ChangeFreq::Weekly, 0.8),
                ("/tags", ChangeFreq::Weekly, 0.8),
                ("/about", ChangeFreq::Monthly, 0.7),
                ("/posts/newer", ChangeFreq::Monthly, 0.6),
                ("/posts/older", ChangeFreq::Monthly, 0.6),
            ]
        );
    }

    #[test]
    fn test_sitemap_is_deterministic() {
        let config = Config::new("Test", "https://example.com");
        let index = test_index();
        let generator = SitemapGenerator::new(&config);
        assert_eq!(generator.generate(&index), generator.generate(&index));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<tag>"), "&lt;tag&gt;");
        assert_eq!(escape_xml("it's"), "it&apos;s");
    }
}
