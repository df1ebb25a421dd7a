//! Markdown renderer using pulldown-cmark.

use std::{collections::HashMap, path::Path};

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use reweave_core::{
    CoreError, HeadingEntry, escape_html,
    frontmatter::{Frontmatter, parse_frontmatter},
};
use thiserror::Error;

use crate::syntax::SyntaxHighlighter;

/// Markdown parsing errors.
#[derive(Debug, Error)]
pub enum MarkdownError {
    /// Failed to parse frontmatter.
    #[error("frontmatter error: {0}")]
    Frontmatter(#[from] CoreError),
}

/// Result type for markdown operations.
pub type Result<T> = std::result::Result<T, MarkdownError>;

/// A source file split into metadata and rendered body.
#[derive(Debug, Clone)]
pub struct ParsedContent {
    pub frontmatter: Frontmatter,

    /// Rendered HTML content.
    pub html: String,

    /// Raw markdown body (without frontmatter).
    pub raw: String,

    /// Headings in document order.
    pub outline: Vec<HeadingEntry>,
}

/// Markdown renderer with syntax highlighting support.
#[derive(Debug)]
pub struct MarkdownRenderer {
    highlighter: SyntaxHighlighter,
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Create a new renderer with default options.
    pub fn new() -> Self {
        Self::with_highlighter(SyntaxHighlighter::default())
    }

    /// Create a renderer with a custom syntax theme.
    pub fn with_theme(theme: &str) -> Self {
        Self::with_highlighter(SyntaxHighlighter::new(theme))
    }

    fn with_highlighter(highlighter: SyntaxHighlighter) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        options.insert(Options::ENABLE_MATH);

        Self {
            highlighter,
            options,
        }
    }

    /// Parse markdown content with frontmatter.
    pub fn parse(&self, content: &str, path: &Path) -> Result<ParsedContent> {
        let (frontmatter, body) = parse_frontmatter(content, path)?;
        let (html, outline) = self.render(body);

        Ok(ParsedContent {
            frontmatter,
            html,
            raw: body.to_string(),
            outline,
        })
    }

    /// Render a markdown body to HTML, collecting the heading outline.
    ///
    /// Heading ids are taken from `{#id}` attributes when present, otherwise
    /// slugified from the heading text. Repeated ids get `-1`, `-2`, ...
    /// suffixes so every anchor in the page is unique.
    pub fn render(&self, content: &str) -> (String, Vec<HeadingEntry>) {
        let parser = Parser::new_ext(content, self.options);
        let mut outline = Vec::new();
        let mut html = String::with_capacity(content.len() * 3 / 2);
        let mut ids = AnchorIds::default();

        let mut heading: Option<OpenHeading> = None;
        let mut code_block: Option<Option<String>> = None;
        let mut code_block_content = String::new();
        let mut image_alt: Option<String> = None;
        let mut in_table_head = false;

        for event in parser {
            match event {
                Event::Start(Tag::Heading { level, id, .. }) => {
                    heading = Some(OpenHeading {
                        level: level as u8,
                        explicit_id: id.map(|i| i.to_string()),
                        text: String::new(),
                        start: html.len(),
                    });
                }

                Event::End(TagEnd::Heading(level)) => {
                    let lvl = level as u8;
                    if let Some(open) = heading.take() {
                        let inner = html.split_off(open.start);
                        let text = open.text.trim().to_string();
                        let id = ids.claim(open.explicit_id.unwrap_or_else(|| slugify(&text)));
                        html.push_str(&format!("<h{lvl} id=\"{}\">{inner}</h{lvl}>\n", escape_html(&id)));
                        outline.push(HeadingEntry {
                            level: lvl,
                            text,
                            id,
                        });
                    }
                }

                Event::Start(Tag::CodeBlock(kind)) => {
                    code_block = Some(match kind {
                        CodeBlockKind::Fenced(lang) => {
                            // Info strings such as "rust,ignore" name the language first.
                            let lang = lang.split([',', ' ']).next().unwrap_or_default();
                            if lang.is_empty() { None } else { Some(lang.to_string()) }
                        }
                        CodeBlockKind::Indented => None,
                    });
                    code_block_content.clear();
                }

                Event::End(TagEnd::CodeBlock) => {
                    if let Some(lang) = code_block.take() {
                        let highlighted = self
                            .highlighter
                            .highlight(&code_block_content, lang.as_deref());
                        html.push_str(&highlighted);
                        html.push('\n');
                    }
                    code_block_content.clear();
                }

                Event::Text(text) if code_block.is_some() => {
                    code_block_content.push_str(&text);
                }

                Event::Text(text) if image_alt.is_some() => {
                    if let Some(alt) = image_alt.as_mut() {
                        alt.push_str(&text);
                    }
                }

                Event::Text(text) => {
                    if let Some(open) = heading.as_mut() {
                        open.text.push_str(&text);
                    }
                    html.push_str(&escape_html(&text));
                }

                Event::Code(code) => {
                    if let Some(open) = heading.as_mut() {
                        open.text.push_str(&code);
                    }
                    html.push_str(&format!("<code>{}</code>", escape_html(&code)));
                }

                Event::SoftBreak => {
                    html.push('\n');
                }

                Event::HardBreak => {
                    html.push_str("<br />\n");
                }

                Event::Start(Tag::Image {
                    dest_url, title, ..
                }) => {
                    html.push_str(&format!("<img src=\"{}\"", escape_html(&dest_url)));
                    if !title.is_empty() {
                        html.push_str(&format!(" title=\"{}\"", escape_html(&title)));
                    }
                    image_alt = Some(String::new());
                }

                Event::End(TagEnd::Image) => {
                    let alt = image_alt.take().unwrap_or_default();
                    html.push_str(&format!(" alt=\"{}\" />", escape_html(&alt)));
                }

                Event::Start(Tag::TableHead) => {
                    in_table_head = true;
                    html.push_str("<thead><tr>");
                }

                Event::End(TagEnd::TableHead) => {
                    in_table_head = false;
                    html.push_str("</tr></thead>\n<tbody>\n");
                }

                Event::Start(Tag::TableCell) => {
                    html.push_str(if in_table_head { "<th>" } else { "<td>" });
                }

                Event::End(TagEnd::TableCell) => {
                    html.push_str(if in_table_head { "</th>" } else { "</td>" });
                }

                Event::Start(tag) => {
                    html.push_str(&tag_to_html_start(&tag));
                }

                Event::End(tag) => {
                    html.push_str(&tag_to_html_end(&tag));
                }

                Event::Html(raw) | Event::InlineHtml(raw) => {
                    html.push_str(&raw);
                }

                Event::FootnoteReference(name) => {
                    let name = escape_html(&name);
                    html.push_str(&format!(
                        "<sup class=\"footnote-ref\"><a href=\"#fn-{name}\">[{name}]</a></sup>"
                    ));
                }

                Event::Rule => {
                    html.push_str("<hr />\n");
                }

                Event::TaskListMarker(checked) => {
                    let checkbox = if checked {
                        "<input type=\"checkbox\" checked disabled />"
                    } else {
                        "<input type=\"checkbox\" disabled />"
                    };
                    html.push_str(checkbox);
                }

                Event::InlineMath(math) => {
                    html.push_str(&format!(
                        "<span class=\"math inline\">\\({}\\)</span>",
                        escape_html(&math)
                    ));
                }

                Event::DisplayMath(math) => {
                    html.push_str(&format!(
                        "<div class=\"math display\">\\[{}\\]</div>",
                        escape_html(&math)
                    ));
                }
            }
        }

        (html, outline)
    }
}

struct OpenHeading {
    level: u8,
    explicit_id: Option<String>,
    text: String,
    /// Byte offset in the output where the heading's inner HTML begins.
    start: usize,
}

/// Hands out unique anchor ids within one document.
#[derive(Default)]
struct AnchorIds {
    seen: HashMap<String, usize>,
}

impl AnchorIds {
    fn claim(&mut self, base: String) -> String {
        let base = if base.is_empty() {
            "section".to_string()
        } else {
            base
        };

        let mut count = self.seen.get(&base).copied().unwrap_or(0);
        let mut candidate = base.clone();
        while self.seen.contains_key(&candidate) {
            count += 1;
            candidate = format!("{base}-{count}");
        }
        self.seen.insert(base.clone(), count);
        self.seen.entry(candidate.clone()).or_insert(0);
        candidate
    }
}

/// Convert a pulldown-cmark tag to HTML opening tag.
fn tag_to_html_start(tag: &Tag) -> String {
    match tag {
        Tag::Paragraph => "<p>".to_string(),
        Tag::BlockQuote(_) => "<blockquote>\n".to_string(),
        Tag::List(Some(1)) => "<ol>\n".to_string(),
        Tag::List(Some(start)) => format!("<ol start=\"{start}\">\n"),
        Tag::List(None) => "<ul>\n".to_string(),
        Tag::Item => "<li>".to_string(),
        Tag::FootnoteDefinition(name) => {
            format!("<div class=\"footnote\" id=\"fn-{}\">", escape_html(name))
        }
        Tag::Table(_) => "<table>\n".to_string(),
        Tag::TableRow => "<tr>".to_string(),
        Tag::Emphasis => "<em>".to_string(),
        Tag::Strong => "<strong>".to_string(),
        Tag::Strikethrough => "<del>".to_string(),
        Tag::Link {
            dest_url, title, ..
        } => {
            let title_attr = if title.is_empty() {
                String::new()
            } else {
                format!(" title=\"{}\"", escape_html(title))
            };
            format!("<a href=\"{}\"{}>", escape_html(dest_url), title_attr)
        }
        Tag::DefinitionList => "<dl>\n".to_string(),
        Tag::DefinitionListTitle => "<dt>".to_string(),
        Tag::DefinitionListDefinition => "<dd>".to_string(),
        Tag::Superscript => "<sup>".to_string(),
        Tag::Subscript => "<sub>".to_string(),
        // Headings, code blocks, images and table cells are handled in `render`.
        Tag::Heading { .. }
        | Tag::CodeBlock(_)
        | Tag::Image { .. }
        | Tag::TableHead
        | Tag::TableCell
        | Tag::HtmlBlock
        | Tag::MetadataBlock(_) => String::new(),
    }
}

/// Convert a pulldown-cmark tag end to HTML closing tag.
fn tag_to_html_end(tag: &TagEnd) -> String {
    match tag {
        TagEnd::Paragraph => "</p>\n".to_string(),
        TagEnd::BlockQuote(_) => "</blockquote>\n".to_string(),
        TagEnd::List(true) => "</ol>\n".to_string(),
        TagEnd::List(false) => "</ul>\n".to_string(),
        TagEnd::Item => "</li>\n".to_string(),
        TagEnd::FootnoteDefinition => "</div>\n".to_string(),
        TagEnd::Table => "</tbody>\n</table>\n".to_string(),
        TagEnd::TableRow => "</tr>\n".to_string(),
        TagEnd::Emphasis => "</em>".to_string(),
        TagEnd::Strong => "</strong>".to_string(),
        TagEnd::Strikethrough => "</del>".to_string(),
        TagEnd::Link => "</a>".to_string(),
        TagEnd::DefinitionList => "</dl>\n".to_string(),
        TagEnd::DefinitionListTitle => "</dt>\n".to_string(),
        TagEnd::DefinitionListDefinition => "</dd>\n".to_string(),
        TagEnd::Superscript => "</sup>".to_string(),
        TagEnd::Subscript => "</sub>".to_string(),
        TagEnd::Heading(_)
        | TagEnd::CodeBlock
        | TagEnd::Image
        | TagEnd::TableHead
        | TagEnd::TableCell
        | TagEnd::HtmlBlock
        | TagEnd::MetadataBlock(_) => String::new(),
    }
}

/// Convert heading text to an anchor id.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
