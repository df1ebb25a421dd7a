//! HTML page generation.
//!
//! Turns documents and index views into complete pages using the layout
//! templates. Every page is wrapped in the shared `base` layout.

use chrono::{Datelike, Utc};
use reweave_core::{Config, Document, HeadingEntry, escape_html};
use thiserror::Error;
use tracing::debug;

use crate::{
    index::{ContentIndex, SiteStats, TaxonomyGroup},
    template::{TemplateContext, TemplateError, TemplateRegistry},
};

/// Characters of content shown under each listing entry.
pub const LIST_SUMMARY_CHARS: usize = 160;

/// HTML generation errors.
#[derive(Debug, Error)]
pub enum HtmlError {
    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Requested page does not exist.
    #[error("no such page: {0}")]
    NoSuchPage(String),
}

/// Result type for HTML generation.
pub type Result<T> = std::result::Result<T, HtmlError>;

/// The two taxonomies documents are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    Category,
    Tag,
}

impl TaxonomyKind {
    /// URL segment of the taxonomy.
    pub fn route(self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Tag => "tags",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Category => "Category",
            Self::Tag => "Tag",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Self::Category => "Categories",
            Self::Tag => "Tags",
        }
    }

    /// Site URL of a term page.
    pub fn term_url(self, slug: &str) -> String {
        format!("/{}/{slug}", self.route())
    }
}

/// HTML page generator.
#[derive(Debug)]
pub struct HtmlGenerator<'a> {
    config: &'a Config,
    templates: TemplateRegistry,
    nav: String,
    year: String,
}

impl<'a> HtmlGenerator<'a> {
    /// Create a generator using the layouts of the configured theme.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            templates: TemplateRegistry::new(config.site.theme),
            nav: nav_html(config),
            year: Utc::now().year().to_string(),
        }
    }

    /// Page for the public document at `position` in the index.
    pub fn post_page(&self, index: &ContentIndex, position: usize) -> Result<String> {
        let doc = index
            .ordered()
            .get(position)
            .ok_or_else(|| HtmlError::NoSuchPage(format!("post #{position}")))?;
        debug!(slug = %doc.slug, "generating post page");

        let mut ctx = TemplateContext::new()
            .with_var("title", escape_html(&doc.title))
            .with_var("date_iso", doc.date.format("%Y-%m-%d").to_string())
            .with_var("date_formatted", doc.date.format("%B %d, %Y").to_string())
            .with_var("content", &doc.html);

        if let Some(category) = &doc.category
            && let Some(group) = index.category(category)
        {
            ctx.insert("category_html", term_link(TaxonomyKind::Category, group));
        }

        let tag_links: Vec<_> = doc
            .tags
            .iter()
            .filter_map(|tag| index.tag(tag))
            .map(|group| term_link(TaxonomyKind::Tag, group))
            .collect();
        if !tag_links.is_empty() {
            ctx.insert(
                "tags_html",
                format!(r#"<div class="tags">{}</div>"#, tag_links.join(" ")),
            );
        }

        if self.config.toc.enabled
            && let Some(toc) = toc_html(&doc.outline, self.config.toc.max_depth)
        {
            ctx.insert("toc", toc);
        }

        let (older, newer) = index.neighbors(position);
        if let Some(nav) = post_nav_html(older, newer) {
            ctx.insert("post_nav", nav);
        }

        let inner = self.templates.render("post", &ctx)?;
        let description = doc.excerpt.as_deref().map(escape_html);
        self.wrap(&doc.title, &doc.url(), &inner, description)
    }

    /// Listing page `current` of `total`.
    ///
    /// Page one is published at both `/` and `/articles`, later pages at
    /// `/articles/<n>`.
    pub fn listing_page(&self, docs: &[Document], current: usize, total: usize) -> Result<String> {
        let items: String = docs.iter().map(list_item_html).collect();
        let mut ctx = TemplateContext::new()
            .with_var("title", "Articles")
            .with_var("items", items);

        if let Some(pagination) = pagination_html(current, total, "/articles") {
            ctx.insert("pagination", pagination);
        }

        let inner = self.templates.render("list", &ctx)?;
        self.wrap("Articles", &listing_url(current), &inner, None)
    }

    /// Page listing the members of one category or tag.
    pub fn term_page(
        &self,
        kind: TaxonomyKind,
        group: &TaxonomyGroup,
        members: &[&Document],
    ) -> Result<String> {
        let items: String = members.iter().copied().map(list_item_html).collect();
        let ctx = TemplateContext::new()
            .with_var("taxonomy_name", kind.label())
            .with_var("term", escape_html(&group.name))
            .with_var("count", members.len().to_string())
            .with_var("items", items);

        let inner = self.templates.render("taxonomy", &ctx)?;
        let title = format!("{}: {}", kind.label(), group.name);
        self.wrap(&title, &kind.term_url(&group.slug), &inner, None)
    }

    /// Index of all categories or tags with their counts.
    pub fn terms_page(&self, kind: TaxonomyKind, groups: &[TaxonomyGroup]) -> Result<String> {
        let items: String = groups.iter().map(|g| term_count_html(kind, g)).collect();
        let ctx = TemplateContext::new()
            .with_var("title", kind.plural())
            .with_var("items", items);

        let inner = self.templates.render("terms", &ctx)?;
        self.wrap(kind.plural(), &format!("/{}", kind.route()), &inner, None)
    }

    /// Archive of every public document, grouped by year.
    pub fn archive_page(&self, index: &ContentIndex) -> Result<String> {
        let categories: String = index
            .categories()
            .iter()
            .map(|g| term_count_html(TaxonomyKind::Category, g))
            .collect();
        let tags: String = index
            .tags()
            .iter()
            .map(|g| term_count_html(TaxonomyKind::Tag, g))
            .collect();

        let years: String = index
            .years_descending()
            .into_iter()
            .map(|(year, docs)| {
                let entries: String = docs
                    .iter()
                    .map(|d| {
                        format!(
                            r#"<li><time datetime="{}">{}</time> <a href="{}">{}</a></li>"#,
                            d.date.format("%Y-%m-%d"),
                            d.date.format("%m-%d"),
                            d.url(),
                            escape_html(&d.title)
                        )
                    })
                    .collect();
                format!(
                    r#"<div class="archive-year"><h2>{year} <span class="count">({})</span></h2><ul>{entries}</ul></div>"#,
                    docs.len()
                )
            })
            .collect();

        let ctx = TemplateContext::new()
            .with_var("total", index.ordered().len().to_string())
            .with_var("categories", categories)
            .with_var("tags", tags)
            .with_var("years", years);

        let inner = self.templates.render("archive", &ctx)?;
        self.wrap("Archive", "/archive", &inner, None)
    }

    /// Statistics page.
    pub fn stats_page(&self, index: &ContentIndex, stats: &SiteStats) -> Result<String> {
        let top_tags: String = stats
            .top_tags
            .iter()
            .map(|(name, count)| match index.tag(name) {
                Some(group) => format!(
                    r#"<li><a href="{}">{}</a> <span class="count">({count})</span></li>"#,
                    TaxonomyKind::Tag.term_url(&group.slug),
                    escape_html(name)
                ),
                None => format!(r#"<li>{} <span class="count">({count})</span></li>"#, escape_html(name)),
            })
            .collect();

        let timeline: String = stats
            .timeline
            .iter()
            .map(|(month, count)| format!(r#"<li><span>{month}</span> <span class="count">{count}</span></li>"#))
            .collect();

        let ctx = TemplateContext::new()
            .with_var("total_posts", stats.total_posts.to_string())
            .with_var("total_chars", stats.total_chars.to_string())
            .with_var("top_tags", top_tags)
            .with_var("timeline", timeline);

        let inner = self.templates.render("stats", &ctx)?;
        self.wrap("Statistics", "/stats", &inner, None)
    }

    /// Standalone page with already rendered content.
    pub fn static_page(&self, title: &str, url: &str, content: &str) -> Result<String> {
        let ctx = TemplateContext::new()
            .with_var("title", escape_html(title))
            .with_var("content", content);
        let inner = self.templates.render("page", &ctx)?;
        self.wrap(title, url, &inner, None)
    }

    pub fn not_found_page(&self) -> Result<String> {
        let ctx = TemplateContext::new().with_var("site_title", escape_html(&self.config.site.title));
        let inner = self.templates.render("not_found", &ctx)?;
        self.wrap("Page not found", "/404", &inner, None)
    }

    /// Wrap inner HTML in the base layout.
    fn wrap(&self, title: &str, url: &str, inner: &str, description: Option<String>) -> Result<String> {
        let site = &self.config.site;
        let mut ctx = TemplateContext::new()
            .with_var("lang", &site.language)
            .with_var("title", escape_html(title))
            .with_var("site_title_suffix", format!(" | {}", escape_html(&site.title)))
            .with_var("canonical_url", self.config.url_for(url))
            .with_var("site_title", escape_html(&site.title))
            .with_var("theme", site.theme.name())
            .with_var("nav", &self.nav)
            .with_var("content", inner)
            .with_var("year", &self.year);

        if let Some(desc) = description.or_else(|| site.description.as_deref().map(escape_html)) {
            ctx.insert("description", desc);
        }
        if let Some(author) = &site.author {
            ctx.insert("author", escape_html(author));
        }

        Ok(self.templates.render("base", &ctx)?)
    }
}

/// Site URL of listing page `n`.
pub fn listing_url(page: usize) -> String {
    if page <= 1 {
        "/".to_string()
    } else {
        format!("/articles/{page}")
    }
}

fn nav_html(config: &Config) -> String {
    let mut links = vec![
        ("/articles", "Articles"),
        ("/archive", "Archive"),
        ("/categories", "Categories"),
        ("/tags", "Tags"),
        ("/stats", "Stats"),
    ];
    if config.pages.about.is_some() {
        links.push(("/about", "About"));
    }
    if config.pages.projects.is_some() {
        links.push(("/projects", "Projects"));
    }

    links
        .iter()
        .map(|(href, label)| format!(r#"<a href="{href}">{label}</a>"#))
        .collect::<Vec<_>>()
        .join("\n            ")
}

fn term_link(kind: TaxonomyKind, group: &TaxonomyGroup) -> String {
    let rel = match kind {
        TaxonomyKind::Category => "category",
        TaxonomyKind::Tag => "tag",
    };
    format!(
        r#"<a href="{}" rel="{rel}">{}</a>"#,
        kind.term_url(&group.slug),
        escape_html(&group.name)
    )
}

fn term_count_html(kind: TaxonomyKind, group: &TaxonomyGroup) -> String {
    format!(
        r#"<li><a href="{}">{}</a> <span class="count">({})</span></li>"#,
        kind.term_url(&group.slug),
        escape_html(&group.name),
        group.len()
    )
}

/// Table of contents for an outline.
///
/// Headings deeper than `max_depth` are dropped. Indentation is relative to
/// the shallowest remaining heading, so a post starting at `h2` is not
/// indented one level.
pub fn toc_html(outline: &[HeadingEntry], max_depth: u8) -> Option<String> {
    let entries: Vec<_> = outline.iter().filter(|h| h.level <= max_depth).collect();
    let base = entries.iter().map(|h| h.level).min()?;

    let items: String = entries
        .iter()
        .map(|h| {
            format!(
                "<li class=\"toc-depth-{}\"><a href=\"#{}\">{}</a></li>",
                h.level - base + 1,
                escape_html(&h.id),
                escape_html(&h.text)
            )
        })
        .collect();

    Some(format!(r#"<nav class="toc"><ul>{items}</ul></nav>"#))
}

fn post_nav_html(older: Option<&Document>, newer: Option<&Document>) -> Option<String> {
    if older.is_none() && newer.is_none() {
        return None;
    }

    let link = |doc: Option<&Document>, rel: &str, arrow_before: bool| {
        doc.map(|d| {
            let title = escape_html(&d.title);
            let text = if arrow_before { format!("← {title}") } else { format!("{title} →") };
            format!(r#"<a href="{}" rel="{rel}">{text}</a>"#, d.url())
        })
        .unwrap_or_else(|| "<span></span>".to_string())
    };

    Some(format!(
        r#"<nav class="post-nav">{}{}</nav>"#,
        link(older, "prev", true),
        link(newer, "next", false)
    ))
}

/// Listing entry for a document.
pub fn list_item_html(doc: &Document) -> String {
    let pinned = if doc.flags.pin {
        r#"<span class="pinned">Pinned</span>"#
    } else {
        ""
    };

    let summary = doc.summary(LIST_SUMMARY_CHARS);
    let summary_html = if summary.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="post-summary">{}</p>"#, escape_html(&summary))
    };

    format!(
        r#"<li class="post-item">
    <div class="post-item-header">
        {pinned}<a href="{}" class="post-title">{}</a>
        <time datetime="{}">{}</time>
    </div>
    {summary_html}
</li>"#,
        doc.url(),
        escape_html(&doc.title),
        doc.date.format("%Y-%m-%d"),
        doc.date.format("%Y-%m-%d"),
    )
}

/// Pagination navigation, or `None` when there is a single page.
///
/// Page one lives at `base_url`, page `n` at `{base_url}/{n}`.
pub fn pagination_html(current: usize, total: usize, base_url: &str) -> Option<String> {
    if total <= 1 {
        return None;
    }

    let page_url = |n: usize| {
        if n <= 1 {
            base_url.to_string()
        } else {
            format!("{base_url}/{n}")
        }
    };

    let mut parts = Vec::new();
    if current > 1 {
        parts.push(format!(r#"<a href="{}" rel="prev">← Previous</a>"#, page_url(current - 1)));
    }
    parts.push(format!("Page {current} of {total}"));
    if current < total {
        parts.push(format!(r#"<a href="{}" rel="next">Next →</a>"#, page_url(current + 1)));
    }

    Some(format!(r#"<nav class="pagination">{}</nav>"#, parts.join(" ")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;
    use reweave_core::{Frontmatter, Theme};

    use super::*;

    fn test_config() -> Config {
        let mut config = Config::new("Test <Site>", "https://example.com");
        config.site.description = Some("A test site".to_string());
        config.site.author = Some("Test Author".to_string());
        config
    }

    fn test_doc(order: usize, title: &str, day: u32, tags: &[&str]) -> Document {
        let fm = Frontmatter {
            title: Some(title.to_string()),
            date: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).single(),
            category: Some("notes".to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Frontmatter::default()
        };
        let outline = vec![
            HeadingEntry { level: 2, text: "Intro".to_string(), id: "intro".to_string() },
            HeadingEntry { level: 3, text: "Details".to_string(), id: "details".to_string() },
            HeadingEntry { level: 5, text: "Deep".to_string(), id: "deep".to_string() },
        ];
        Document::from_parts(
            fm,
            PathBuf::from(format!("post-{order}.md")),
            order,
            "<p>Hello, World!</p>".to_string(),
            outline,
        )
    }

    fn test_index() -> ContentIndex {
        ContentIndex::build(
            vec![
                test_doc(0, "Oldest", 1, &["rust"]),
                test_doc(1, "Middle & More", 2, &["rust", "c++"]),
                test_doc(2, "Newest", 3, &[]),
            ],
            2,
        )
    }

    #[test]
    fn test_post_page() {
        let config = test_config();
        let index = test_index();
        let html = HtmlGenerator::new(&config).post_page(&index, 1).unwrap();

        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("<title>Middle &amp; More | Test &lt;Site&gt;</title>"));
        assert!(html.contains("<p>Hello, World!</p>"));
        assert!(html.contains(r#"<a href="/tags/632b2b" rel="tag">c++</a>"#));
        assert!(html.contains(r#"<a href="/categories/notes" rel="category">notes</a>"#));
        assert!(html.contains(r#"<link rel="canonical" href="https://example.com/posts/post-1">"#));
        assert!(html.contains(r#"href="/posts/post-0" rel="prev""#));
        assert!(html.contains(r#"href="/posts/post-2" rel="next""#));
        assert!(html.contains(r#"<body class="theme-default">"#));
    }

    #[test]
    fn test_post_page_out_of_range() {
        let config = test_config();
        let result = HtmlGenerator::new(&config).post_page(&test_index(), 9);
        assert!(matches!(result, Err(HtmlError::NoSuchPage(_))));
    }

    #[test]
    fn test_toc_relative_depth() {
        let doc = test_doc(0, "T", 1, &[]);
        let toc = toc_html(&doc.outline, 3).unwrap();

        assert!(toc.contains(r##"<li class="toc-depth-1"><a href="#intro">Intro</a></li>"##));
        assert!(toc.contains(r##"<li class="toc-depth-2"><a href="#details">Details</a></li>"##));
        assert!(!toc.contains("deep"));
        assert!(toc_html(&doc.outline, 1).is_none());
    }

    #[test]
    fn test_toc_escapes_anchor_ids() {
        let outline = vec![HeadingEntry {
            level: 2,
            text: "Quote".to_string(),
            id: r#"a"b<c"#.to_string(),
        }];
        let toc = toc_html(&outline, 3).unwrap();
        assert!(toc.contains(r##"href="#a&quot;b&lt;c""##));
    }

    #[test]
    fn test_toc_disabled() {
        let mut config = test_config();
        config.toc.enabled = false;
        let html = HtmlGenerator::new(&config).post_page(&test_index(), 0).unwrap();
        assert!(!html.contains(r#"<nav class="toc">"#));
    }

    #[test]
    fn test_listing_page_pagination() {
        let config = test_config();
        let index = test_index();
        let generator = HtmlGenerator::new(&config);

        let first = generator
            .listing_page(index.page(1).unwrap(), 1, index.total_pages())
            .unwrap();
        assert!(first.contains("Page 1 of 2"));
        assert!(first.contains(r#"<a href="/articles/2" rel="next">"#));
        assert!(first.contains("/posts/post-2"));
        assert!(!first.contains("/posts/post-0"));

        let second = generator
            .listing_page(index.page(2).unwrap(), 2, index.total_pages())
            .unwrap();
        assert!(second.contains(r#"<a href="/articles" rel="prev">"#));
        assert!(second.contains("/posts/post-0"));
        assert!(second.contains(r#"href="https://example.com/articles/2""#));
    }

    #[test]
    fn test_list_item_marks_pinned() {
        let mut doc = test_doc(0, "Pinned post", 1, &[]);
        assert!(!list_item_html(&doc).contains("pinned"));
        doc.flags.pin = true;
        assert!(list_item_html(&doc).contains(r#"<span class="pinned">Pinned</span>"#));
    }

    #[test]
    fn test_list_item_summary_escaped_once() {
        let mut doc = test_doc(0, "Cartoons", 1, &[]);
        doc.html = "<p>Tom &amp; &quot;Jerry&quot;</p>".to_string();
        let item = list_item_html(&doc);

        assert!(item.contains(r#"<p class="post-summary">Tom &amp; &quot;Jerry&quot;</p>"#));
        assert!(!item.contains("&amp;amp;"));
        assert!(!item.contains("&amp;quot;"));
    }

    #[test]
    fn test_terms_and_term_pages() {
        let config = test_config();
        let index = test_index();
        let generator = HtmlGenerator::new(&config);

        let tags = generator.terms_page(TaxonomyKind::Tag, index.tags()).unwrap();
        assert!(tags.contains(r#"<li><a href="/tags/rust">rust</a> <span class="count">(2)</span></li>"#));
        assert!(tags.contains(r#"<a href="/tags/632b2b">c++</a>"#));

        let group = index.tag("rust").unwrap();
        let members: Vec<_> = index.members(group).collect();
        let page = generator.term_page(TaxonomyKind::Tag, group, &members).unwrap();
        assert!(page.contains("Tag: <span>rust</span>"));
        assert!(page.contains("/posts/post-0"));
        assert!(page.contains("/posts/post-1"));
        assert!(!page.contains("/posts/post-2"));
    }

    #[test]
    fn test_archive_and_stats_pages() {
        let config = test_config();
        let index = test_index();
        let generator = HtmlGenerator::new(&config);

        let archive = generator.archive_page(&index).unwrap();
        assert!(archive.contains("<h2>2024 <span class=\"count\">(3)</span></h2>"));
        assert!(archive.contains(r#"<a href="/categories/notes">notes</a> <span class="count">(3)</span>"#));

        let stats = generator.stats_page(&index, &index.stats()).unwrap();
        assert!(stats.contains("<dt>Posts</dt><dd>3</dd>"));
        assert!(stats.contains("<span>2024-03</span>"));
        assert!(stats.contains(r#"<a href="/tags/rust">rust</a> <span class="count">(2)</span>"#));
    }

    #[test]
    fn test_static_and_not_found_pages() {
        let mut config = test_config();
        config.site.theme = Theme::Weave;
        let generator = HtmlGenerator::new(&config);

        let about = generator.static_page("About", "/about", "<p>Me</p>").unwrap();
        assert!(about.contains("<h1>About</h1>"));
        assert!(about.contains(r#"<body class="theme-weave">"#));

        let not_found = generator.not_found_page().unwrap();
        assert!(not_found.contains("<h1>404</h1>"));
    }

    #[test]
    fn test_pagination_html() {
        assert!(pagination_html(1, 1, "/articles").is_none());

        let html = pagination_html(1, 3, "/articles").unwrap();
        assert!(html.contains("Page 1 of 3"));
        assert!(!html.contains("Previous"));

        let html = pagination_html(3, 3, "/articles").unwrap();
        assert!(html.contains(r#"<a href="/articles/2" rel="prev">"#));
        assert!(!html.contains("Next"));
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(listing_url(1), "/");
        assert_eq!(listing_url(4), "/articles/4");
    }
}
