//! Article model
//!
//! Localized articles written in markdown. Only published articles are
//! visible on the public site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Content locale, e.g. "en" or "ar"
    pub locale: String,
    pub title: String,
    pub excerpt: Option<String>,
    /// Markdown source
    pub content: String,
    /// Rendered and sanitized HTML
    pub content_html: String,
    pub cover_image: Option<String>,
    pub status: ArticleStatus,
    pub author_id: i64,
    /// Set the first time the article is published
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published
    }
}

/// Article publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArticleStatus {
    /// Not visible to the public
    Draft,
    Published,
    /// Hidden but not deleted
    Archived,
}

impl Default for ArticleStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl ArticleStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
            ArticleStatus::Archived => "archived",
        }
    }

    /// Parse status from database string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(ArticleStatus::Draft),
            "published" => Some(ArticleStatus::Published),
            "archived" => Some(ArticleStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row-level input for creating an article. Slug and HTML are already final.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub slug: String,
    pub locale: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub content_html: String,
    pub cover_image: Option<String>,
    pub status: ArticleStatus,
    pub author_id: i64,
    pub published_at: Option<DateTime<Utc>>,
}

/// Partial update of an article. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateArticleInput {
    pub slug: Option<String>,
    pub locale: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub status: Option<ArticleStatus>,
}

impl UpdateArticleInput {
    pub fn has_changes(&self) -> bool {
        self.slug.is_some()
            || self.locale.is_some()
            || self.title.is_some()
            || self.excerpt.is_some()
            || self.content.is_some()
            || self.cover_image.is_some()
            || self.status.is_some()
    }
}

/// Filters for article listings
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub locale: Option<String>,
    pub status: Option<ArticleStatus>,
    pub author_id: Option<i64>,
}

impl ArticleFilter {
    /// Public listing: published articles, optionally in one locale
    pub fn published(locale: Option<String>) -> Self {
        Self {
            locale,
            status: Some(ArticleStatus::Published),
            author_id: None,
        }
    }
}
