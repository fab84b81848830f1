//! Text, slug and HTML sanitization
//!
//! Everything user-supplied that is stored or rendered passes through here.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static DANGEROUS_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|iframe|object|embed|form)\b[^>]*>.*?</\s*(script|style|iframe|object|embed|form)\s*>")
        .expect("valid block regex")
});

static DANGEROUS_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?\s*(script|style|iframe|object|embed|form|link|meta|base)\b[^>]*>")
        .expect("valid tag regex")
});

static EVENT_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid attr regex")
});

static UNSAFE_URL_DQ_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(href|src)\s*=\s*"\s*(javascript|vbscript|data):[^"]*""#)
        .expect("valid url regex")
});

static UNSAFE_URL_SQ_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(href|src)\s*=\s*'\s*(javascript|vbscript|data):[^']*'"#)
        .expect("valid url regex")
});

const MAX_SLUG_CHARS: usize = 200;

/// Remove anything that looks like a markup tag
pub fn strip_tags(input: &str) -> String {
    TAG_RE.replace_all(input, "").into_owned()
}

/// Plain text for storage: tags stripped, control characters dropped, trimmed
pub fn clean_text(input: &str) -> String {
    strip_tags(input)
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Optional variant of [`clean_text`]: blank input becomes `None`
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_text).filter(|s| !s.is_empty())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// URL-friendly slug. Letters of any script are kept, so Arabic titles
/// produce Arabic slugs.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug.chars().take(MAX_SLUG_CHARS).collect::<String>().trim_end_matches('-').to_string()
}

/// Whether a link target is safe to render
pub fn is_safe_url(url: &str) -> bool {
    let lower = url.trim().to_lowercase();
    match lower.split_once(':') {
        // No scheme, or the colon comes after a path separator
        None => true,
        Some((scheme, _)) if scheme.contains('/') || scheme.contains('?') || scheme.contains('#') => {
            true
        }
        Some((scheme, _)) => matches!(scheme, "http" | "https" | "mailto" | "tel"),
    }
}

/// Remove active content from rendered HTML: script-like elements, event
/// handler attributes and script URLs. Attribute rules only apply inside
/// tags, text between them is left alone.
pub fn sanitize_html(html: &str) -> String {
    let out = DANGEROUS_BLOCK_RE.replace_all(html, "");
    let out = DANGEROUS_TAG_RE.replace_all(&out, "");
    TAG_RE
        .replace_all(&out, |caps: &Captures| sanitize_tag(&caps[0]))
        .into_owned()
}

fn sanitize_tag(tag: &str) -> String {
    let tag = EVENT_ATTR_RE.replace_all(tag, "");
    let tag = UNSAFE_URL_DQ_RE.replace_all(&tag, "$1=\"#\"");
    UNSAFE_URL_SQ_RE.replace_all(&tag, "$1=\"#\"").into_owned()
}
