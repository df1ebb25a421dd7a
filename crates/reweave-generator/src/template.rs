//! Page layout templates.
//!
//! A small interpolation engine: `{{ name }}` is replaced by the context
//! value and fails when missing, `{{ name? }}` renders as empty instead.
//! Substituted values are never re-scanned.

use std::collections::HashMap;

use reweave_core::Theme;
use thiserror::Error;

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Missing required variable.
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    /// Template not found.
    #[error("template not found: {0}")]
    NotFound(String),

    /// Invalid template syntax.
    #[error("invalid template syntax: {0}")]
    InvalidSyntax(String),
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Variables available to a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }
}

/// A named template body.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    content: String,
}

impl Template {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the template with the given context.
    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        let mut out = String::with_capacity(self.content.len());
        let mut rest = self.content.as_str();

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| {
                TemplateError::InvalidSyntax(format!("unclosed {{{{ in template '{}'", self.name))
            })?;

            let expr = after[..close].trim();
            let (key, optional) = match expr.strip_suffix('?') {
                Some(key) => (key.trim_end(), true),
                None => (expr, false),
            };

            if key.is_empty() {
                return Err(TemplateError::InvalidSyntax(format!(
                    "empty placeholder in template '{}'",
                    self.name
                )));
            }

            match context.get(key) {
                Some(value) => out.push_str(value),
                None if optional => {}
                None => return Err(TemplateError::MissingVariable(key.to_string())),
            }

            rest = &after[close + 2..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// Templates by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Registry holding the built-in layouts for `theme`.
    #[must_use]
    pub fn new(theme: Theme) -> Self {
        let mut registry = Self::default();
        registry.register_defaults(theme);
        registry
    }

    fn register_defaults(&mut self, theme: Theme) {
        let base = BASE_TEMPLATE.replace("{{ theme_style }}", theme_style(theme));
        self.register(Template::new("base", base));
        self.register(Template::new("post", POST_TEMPLATE));
        self.register(Template::new("list", LIST_TEMPLATE));
        self.register(Template::new("taxonomy", TAXONOMY_TEMPLATE));
        self.register(Template::new("terms", TERMS_TEMPLATE));
        self.register(Template::new("archive", ARCHIVE_TEMPLATE));
        self.register(Template::new("stats", STATS_TEMPLATE));
        self.register(Template::new("page", PAGE_TEMPLATE));
        self.register(Template::new("not_found", NOT_FOUND_TEMPLATE));
    }

    /// Register a template, replacing any with the same name.
    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Render a named template with the given context.
    pub fn render(&self, name: &str, context: &TemplateContext) -> Result<String> {
        let template = self
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        template.render(context)
    }
}

/// Stylesheet fragment for a theme.
fn theme_style(theme: Theme) -> &'static str {
    match theme {
        Theme::Default => DEFAULT_STYLE,
        Theme::Butterfly => BUTTERFLY_STYLE,
        Theme::Weave => WEAVE_STYLE,
        Theme::Landing => LANDING_STYLE,
        Theme::Gitbook => GITBOOK_STYLE,
    }
}

const DEFAULT_STYLE: &str = r#"<style>
        :root { --fg: #1e293b; --muted: #64748b; --bg: #f8fafc; --accent: #3b82f6; --border: #e2e8f0; }
        body { font-family: system-ui, sans-serif; max-width: 46rem; margin: 0 auto; padding: 0 1rem; }
    </style>"#;

const BUTTERFLY_STYLE: &str = r#"<style>
        :root { --fg: #4c4948; --muted: #858585; --bg: #f6f8fa; --accent: #49b1f5; --border: #e3e8f7; }
        body { font-family: "Lato", sans-serif; max-width: 64rem; margin: 0 auto; padding: 0 1.5rem; }
        article { background: #fff; border-radius: 8px; padding: 1.5rem; box-shadow: 0 3px 8px rgb(0 0 0 / 5%); }
    </style>"#;

const WEAVE_STYLE: &str = r#"<style>
        :root { --fg: #e2e8f0; --muted: #94a3b8; --bg: #0f172a; --accent: #f97316; --border: #334155; }
        body { font-family: "Inter", sans-serif; max-width: 52rem; margin: 0 auto; padding: 0 1rem; }
    </style>"#;

const LANDING_STYLE: &str = r#"<style>
        :root { --fg: #111827; --muted: #6b7280; --bg: #ffffff; --accent: #10b981; --border: #e5e7eb; }
        body { font-family: system-ui, sans-serif; max-width: 72rem; margin: 0 auto; padding: 0 2rem; }
        header nav { justify-content: center; }
    </style>"#;

const GITBOOK_STYLE: &str = r#"<style>
        :root { --fg: #3b454e; --muted: #9daab6; --bg: #ffffff; --accent: #346ddb; --border: #e6ecf1; }
        body { font-family: "Roboto", sans-serif; max-width: 60rem; margin: 0 auto; padding: 0 1rem; }
        header nav { flex-direction: column; gap: 0.25rem; }
    </style>"#;

/// Outer HTML document shared by every page.
pub const BASE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="{{ lang }}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ title }}{{ site_title_suffix? }}</title>
    <meta name="description" content="{{ description? }}">
    <meta name="author" content="{{ author? }}">
    <meta name="generator" content="ReWeave">
    <link rel="canonical" href="{{ canonical_url }}">
    <link rel="alternate" type="application/rss+xml" title="{{ site_title }}" href="/rss.xml">
    {{ theme_style }}
    <style>
        body { color: var(--fg); background: var(--bg); line-height: 1.7; }
        a { color: var(--accent); text-decoration: none; }
        header nav { display: flex; gap: 1rem; flex-wrap: wrap; padding: 1rem 0; border-bottom: 1px solid var(--border); }
        .site-title { font-weight: 700; margin-right: auto; }
        time, .count, .post-meta { color: var(--muted); }
        .post-list { list-style: none; padding: 0; }
        .post-item { padding: 0.75rem 0; border-bottom: 1px solid var(--border); }
        .pinned { font-size: 0.8em; color: var(--accent); margin-right: 0.5em; }
        .toc li.toc-depth-2 { margin-left: 1rem; }
        .toc li.toc-depth-3 { margin-left: 2rem; }
        .toc li.toc-depth-4 { margin-left: 3rem; }
        .toc li.toc-depth-5 { margin-left: 4rem; }
        .toc li.toc-depth-6 { margin-left: 5rem; }
        .post-nav { display: flex; justify-content: space-between; margin-top: 2rem; }
        .render-error { border-left: 4px solid #ef4444; padding-left: 1rem; }
        footer { color: var(--muted); padding: 2rem 0; border-top: 1px solid var(--border); }
    </style>
</head>
<body class="theme-{{ theme }}">
    <header>
        <nav>
            <a href="/" class="site-title">{{ site_title }}</a>
            {{ nav }}
        </nav>
    </header>
    <main>
        {{ content }}
    </main>
    <footer>
        <p>&copy; {{ year }} {{ site_title }}. Built with ReWeave.</p>
    </footer>
</body>
</html>
"#;

/// Single post body.
pub const POST_TEMPLATE: &str = r#"<article class="post">
    <header>
        <h1>{{ title }}</h1>
        <div class="post-meta">
            <time datetime="{{ date_iso }}">{{ date_formatted }}</time>
            {{ category_html? }}
        </div>
        {{ tags_html? }}
    </header>
    {{ toc? }}
    <div class="content">
        {{ content }}
    </div>
    {{ post_nav? }}
</article>"#;

/// Paginated listing of posts.
pub const LIST_TEMPLATE: &str = r#"<section class="listing">
    <h1>{{ title }}</h1>
    <ul class="post-list">
        {{ items }}
    </ul>
    {{ pagination? }}
</section>"#;

/// Members of one category or tag.
pub const TAXONOMY_TEMPLATE: &str = r#"<section class="taxonomy">
    <h1>{{ taxonomy_name }}: <span>{{ term }}</span></h1>
    <p class="count">{{ count }} posts</p>
    <ul class="post-list">
        {{ items }}
    </ul>
</section>"#;

/// Every category or tag with its count.
pub const TERMS_TEMPLATE: &str = r#"<section class="terms">
    <h1>{{ title }}</h1>
    <ul class="term-list">
        {{ items }}
    </ul>
</section>"#;

/// Posts by year, plus taxonomy counts.
pub const ARCHIVE_TEMPLATE: &str = r#"<section class="archive">
    <h1>Archive</h1>
    <p class="count">{{ total }} posts</p>
    <div class="archive-taxonomies">
        <h2>Categories</h2>
        <ul>{{ categories }}</ul>
        <h2>Tags</h2>
        <ul>{{ tags }}</ul>
    </div>
    {{ years }}
</section>"#;

/// Site statistics.
pub const STATS_TEMPLATE: &str = r#"<section class="stats">
    <h1>Statistics</h1>
    <dl>
        <dt>Posts</dt><dd>{{ total_posts }}</dd>
        <dt>Characters</dt><dd>{{ total_chars }}</dd>
    </dl>
    <h2>Top tags</h2>
    <ol class="top-tags">{{ top_tags }}</ol>
    <h2>Timeline</h2>
    <ul class="timeline">{{ timeline }}</ul>
</section>"#;

/// Standalone page.
pub const PAGE_TEMPLATE: &str = r#"<article class="page">
    <h1>{{ title }}</h1>
    <div class="content">
        {{ content }}
    </div>
</article>"#;

pub const NOT_FOUND_TEMPLATE: &str = r#"<section class="not-found">
    <h1>404</h1>
    <p>The page you are looking for does not exist.</p>
    <p><a href="/">Back to {{ site_title }}</a></p>
</section>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_simple_render() {
        let template = Template::new("test", "Hello, {{ name }}!");
        let ctx = TemplateContext::new().with_var("name", "World");

        assert_eq!(template.render(&ctx).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_template_optional_variable() {
        let template = Template::new("test", "Hello{{ suffix? }}!");

        assert_eq!(template.render(&TemplateContext::new()).unwrap(), "Hello!");

        let ctx = TemplateContext::new().with_var("suffix", ", World");
        assert_eq!(template.render(&ctx).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_template_missing_required_variable() {
        let template = Template::new("test", "Hello, {{ name }}!");
        let result = template.render(&TemplateContext::new());
        assert!(matches!(result, Err(TemplateError::MissingVariable(ref v)) if v == "name"));
    }

    #[test]
    fn test_template_unclosed_placeholder() {
        let template = Template::new("broken", "Hello, {{ name");
        let result = template.render(&TemplateContext::new().with_var("name", "x"));
        assert!(matches!(result, Err(TemplateError::InvalidSyntax(_))));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = Template::new("test", "<p>{{ body }}</p>");
        let ctx = TemplateContext::new().with_var("body", "literal {{ braces }}");
        assert_eq!(template.render(&ctx).unwrap(), "<p>literal {{ braces }}</p>");
    }

    #[test]
    fn test_registry_defaults() {
        let registry = TemplateRegistry::new(Theme::Default);

        for name in ["base", "post", "list", "taxonomy", "terms", "archive", "stats", "page", "not_found"] {
            assert!(registry.get(name).is_some(), "missing template {name}");
        }
        assert!(matches!(
            registry.render("nonexistent", &TemplateContext::new()),
            Err(TemplateError::NotFound(_))
        ));
    }

    #[test]
    fn test_base_template_uses_theme_style() {
        let ctx = TemplateContext::new()
            .with_var("lang", "en")
            .with_var("title", "My Page")
            .with_var("canonical_url", "https://example.com/my-page")
            .with_var("site_title", "My Site")
            .with_var("theme", "butterfly")
            .with_var("nav", "")
            .with_var("content", "<p>Hello!</p>")
            .with_var("year", "2024");

        let butterfly = TemplateRegistry::new(Theme::Butterfly).render("base", &ctx).unwrap();
        let weave = TemplateRegistry::new(Theme::Weave).render("base", &ctx).unwrap();

        assert!(butterfly.contains("<title>My Page</title>"));
        assert!(butterfly.contains("<p>Hello!</p>"));
        assert!(butterfly.contains("#49b1f5"));
        assert!(!weave.contains("#49b1f5"));
    }
}
