//! Markdown rendering for articles
//!
//! pulldown-cmark with tables, strikethrough and task lists. Raw HTML in the
//! source is rendered as text, unsafe link targets are neutralized, and the
//! output goes through [`sanitize_html`] before it is stored.
//!
//! ```
//! use motionhouse::services::markdown::MarkdownRenderer;
//!
//! let html = MarkdownRenderer::new().render("# Showreel\n\nThis is **bold**.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

use super::sanitize::{is_safe_url, sanitize_html, strip_tags};

/// Characters of plain text kept for a generated excerpt
const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        Self { options }
    }

    /// Render markdown to sanitized HTML
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options).map(neutralize);

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        sanitize_html(&out)
    }

    /// Plain-text excerpt from the rendered article, cut at a word boundary
    pub fn excerpt(&self, markdown: &str) -> String {
        let text = strip_tags(&self.render(markdown));
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

        if text.chars().count() <= EXCERPT_CHARS {
            return text;
        }
        let cut: String = text.chars().take(EXCERPT_CHARS).collect();
        match cut.rfind(' ') {
            Some(idx) => format!("{}…", &cut[..idx]),
            None => format!("{}…", cut),
        }
    }
}

fn neutralize(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_dest(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_dest(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_dest(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        CowStr::Borrowed("#")
    }
}
