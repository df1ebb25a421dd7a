//! RSS feed generation.
//!
//! Generates an RSS 2.0 feed of the newest public documents. The output
//! depends only on the index and site metadata, so rebuilding an unchanged
//! site produces an identical file.

use std::io::Write;

use reweave_core::{Config, Document};
use rss::{
    Category, ChannelBuilder, GuidBuilder, Item, ItemBuilder,
    extension::atom::{AtomExtension, Link},
};
use thiserror::Error;
use tracing::debug;

use crate::index::ContentIndex;

/// Characters kept when an item's description falls back to its content.
pub const SUMMARY_CHARS: usize = 200;

/// RSS generation errors.
#[derive(Debug, Error)]
pub enum RssError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for RSS operations.
pub type Result<T> = std::result::Result<T, RssError>;

/// RSS feed generator.
#[derive(Debug)]
pub struct RssGenerator<'a> {
    config: &'a Config,
}

impl<'a> RssGenerator<'a> {
    /// Create a new RSS generator.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Generate RSS feed XML from the index.
    pub fn generate(&self, index: &ContentIndex) -> String {
        let limit = self.config.rss.limit;
        let items: Vec<Item> = index
            .ordered()
            .iter()
            .take(limit)
            .map(|doc| self.document_to_item(doc))
            .collect();

        debug!(count = items.len(), limit, "generating RSS feed");

        ChannelBuilder::default()
            .title(self.config.site.title.clone())
            .link(self.config.url_for("/"))
            .description(
                self.config
                    .site
                    .description
                    .clone()
                    .unwrap_or_else(|| self.config.site.title.clone()),
            )
            .language(Some(self.config.site.language.clone()))
            .generator(Some("ReWeave".to_string()))
            .atom_ext(Some(self.self_link()))
            .items(items)
            .build()
            .to_string()
    }

    /// `atom:link rel="self"` pointing at the feed itself.
    fn self_link(&self) -> AtomExtension {
        let mut link = Link::default();
        link.set_href(self.config.url_for("/rss.xml"));
        link.set_rel("self");
        link.set_mime_type(Some("application/rss+xml".to_string()));

        let mut ext = AtomExtension::default();
        ext.set_links(vec![link]);
        ext
    }

    /// Convert a document to an RSS item.
    fn document_to_item(&self, doc: &Document) -> Item {
        let url = self.config.url_for(&doc.url());
        let guid = GuidBuilder::default().value(url.clone()).permalink(true).build();

        let categories: Vec<_> = doc
            .tags
            .iter()
            .map(|tag| Category {
                name: tag.clone(),
                domain: None,
            })
            .collect();

        let mut builder = ItemBuilder::default();
        builder
            .title(Some(doc.title.clone()))
            .link(Some(url))
            .guid(Some(guid))
            .pub_date(Some(doc.date.to_rfc2822()))
            .description(Some(doc.summary(SUMMARY_CHARS)))
            .categories(categories);

        if let Some(author) = &self.config.site.author {
            builder.author(Some(author.clone()));
        }

        builder.build()
    }

    /// Write RSS feed to a writer.
    pub fn write_to<W: Write>(&self, index: &ContentIndex, writer: &mut W) -> Result<()> {
        let xml = self.generate(index);
        writer.write_all(xml.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};
    use reweave_core::Frontmatter;

    use super::*;

    fn test_config() -> Config {
        let mut config = Config::new("Test Site", "https://example.com");
        config.site.description = Some("A test site".to_string());
        config.rss.limit = 2;
        config
    }

    fn test_doc(order: usize, title: &str, day: u32) -> Document {
        let fm = Frontmatter {
            title: Some(title.to_string()),
            date: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).single(),
            tags: vec!["rust".to_string()],
            ..Frontmatter::default()
        };
        Document::from_parts(
            fm,
            PathBuf::from(format!("{}.md", title.to_lowercase())),
            order,
            format!("<p>{title} body <em>and</em> more</p>"),
            vec![],
        )
    }

    fn test_index() -> ContentIndex {
        ContentIndex::build(
            vec![test_doc(0, "First", 1), test_doc(1, "Second", 2), test_doc(2, "Third", 3)],
            10,
        )
    }

    #[test]
    fn test_generate_rss() {
        let config = test_config();
        let xml = RssGenerator::new(&config).generate(&test_index());

        assert!(xml.contains("<rss"));
        assert!(xml.contains("<title>Test Site</title>"));
        assert!(xml.contains("<description>A test site</description>"));
        assert!(xml.contains("https://example.com/posts/third"));
        assert!(xml.contains("<category>rust</category>"));
        assert!(xml.contains("Jan 2024 12:00:00 +0000"));
    }

    #[test]
    fn test_feed_links_to_itself() {
        let config = test_config();
        let xml = RssGenerator::new(&config).generate(&test_index());

        assert!(xml.contains("xmlns:atom=\"http://www.w3.org/2005/Atom\""));
        assert!(xml.contains("<atom:link"));
        assert!(xml.contains("href=\"https://example.com/rss.xml\""));
        assert!(xml.contains("rel=\"self\""));
    }

    #[test]
    fn test_description_is_not_double_escaped() {
        let config = test_config();
        let mut doc = test_doc(0, "Cartoons", 4);
        doc.html = "<p>Tom &amp; Jerry</p>".to_string();
        let xml = RssGenerator::new(&config).generate(&ContentIndex::build(vec![doc], 10));

        assert!(
            xml.contains("<![CDATA[Tom & Jerry]]>")
                || xml.contains("<description>Tom &amp; Jerry</description>")
        );
        assert!(!xml.contains("&amp;amp;"));
    }

    #[test]
    fn test_rss_limit_takes_newest() {
        let config = test_config();
        let xml = RssGenerator::new(&config).generate(&test_index());

        assert!(xml.contains("Third"));
        assert!(xml.contains("Second"));
        assert!(!xml.contains("<title>First</title>"));
    }

    #[test]
    fn test_description_falls_back_to_content() {
        let config = test_config();
        let xml = RssGenerator::new(&config).generate(&test_index());
        assert!(xml.contains("Third body and more"));
    }

    #[test]
    fn test_rss_is_deterministic() {
        let config = test_config();
        let index = test_index();
        let generator = RssGenerator::new(&config);

        assert_eq!(generator.generate(&index), generator.generate(&index));
        assert!(!generator.generate(&index).contains("lastBuildDate"));
    }

    #[test]
    fn test_write_to() {
        let config = test_config();
        let mut out = Vec::new();
        RssGenerator::new(&config)
            .write_to(&test_index(), &mut out)
            .expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("<channel>"));
    }
}
