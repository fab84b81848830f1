//! Article service
//!
//! Implements business logic for article management:
//! - Create, read, update, delete articles
//! - Markdown rendering and generated excerpts
//! - Slug generation and uniqueness
//! - Publication lifecycle and author ownership

use chrono::Utc;
use std::sync::Arc;

use crate::db::repositories::ArticleRepository;
use crate::models::{
    Article, ArticleFilter, ArticleStatus, ListParams, NewArticle, PagedResult,
    UpdateArticleInput, User,
};
use crate::services::markdown::MarkdownRenderer;
use crate::services::sanitize::{clean_optional, clean_text, is_safe_url, slugify};

/// Upper bound on numeric suffixes tried for a generated slug
const MAX_SLUG_SUFFIX: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("Article not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Article slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for creating an article
#[derive(Debug, Clone, Default)]
pub struct CreateArticleInput {
    pub title: String,
    /// Generated from the title when absent
    pub slug: Option<String>,
    /// Default locale when absent
    pub locale: Option<String>,
    /// Generated from the content when absent
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub status: Option<ArticleStatus>,
}

pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    renderer: MarkdownRenderer,
    locales: Vec<String>,
    default_locale: String,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>, locales: Vec<String>, default_locale: String) -> Self {
        Self {
            repo,
            renderer: MarkdownRenderer::new(),
            locales,
            default_locale,
        }
    }

    pub async fn create(
        &self,
        author: &User,
        input: CreateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let title = clean_text(&input.title);
        if title.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if input.content.trim().is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Content cannot be empty".to_string(),
            ));
        }

        let locale = self.resolve_locale(input.locale.as_deref())?;
        let slug = match input.slug.as_deref().map(slugify).filter(|s| !s.is_empty()) {
            Some(slug) => {
                if self.repo.exists_by_slug(&slug, None).await? {
                    return Err(ArticleServiceError::DuplicateSlug(slug));
                }
                slug
            }
            None => self.unique_slug(&title, None).await?,
        };
        let cover_image = validate_cover(input.cover_image.as_deref())?;
        let excerpt = clean_optional(input.excerpt.as_deref())
            .or_else(|| Some(self.renderer.excerpt(&input.content)).filter(|e| !e.is_empty()));
        let status = input.status.unwrap_or_default();

        let article = self
            .repo
            .create(&NewArticle {
                slug,
                locale,
                title,
                excerpt,
                content_html: self.renderer.render(&input.content),
                content: input.content,
                cover_image,
                status,
                author_id: author.id,
                published_at: (status == ArticleStatus::Published).then(Utc::now),
            })
            .await?;

        tracing::info!(article_id = article.id, slug = %article.slug, "Article created");
        Ok(article)
    }

    pub async fn get(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ArticleServiceError::NotFound(format!("Article with ID {} not found", id)))
    }

    /// Published article by slug; drafts and archived articles are not found
    pub async fn get_public_by_slug(&self, slug: &str) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_slug(slug)
            .await?
            .filter(Article::is_published)
            .ok_or_else(|| ArticleServiceError::NotFound(format!("Article '{}' not found", slug)))
    }

    pub async fn list_public(
        &self,
        locale: Option<&str>,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, ArticleServiceError> {
        let locale = match locale {
            Some(locale) => Some(self.resolve_locale(Some(locale))?),
            None => None,
        };
        let (articles, total) = self
            .repo
            .list(&ArticleFilter::published(locale), params)
            .await?;
        Ok(PagedResult::new(articles, total, params))
    }

    pub async fn list_admin(
        &self,
        filter: &ArticleFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, ArticleServiceError> {
        let (articles, total) = self.repo.list(filter, params).await?;
        Ok(PagedResult::new(articles, total, params))
    }

    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let mut article = self.get(id).await?;
        self.check_owner(actor, &article)?;

        if !input.has_changes() {
            return Ok(article);
        }

        if let Some(title) = input.title {
            let title = clean_text(&title);
            if title.is_empty() {
                return Err(ArticleServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ));
            }
            article.title = title;
        }
        if let Some(slug) = input.slug {
            let slug = slugify(&slug);
            if slug.is_empty() {
                return Err(ArticleServiceError::ValidationError(
                    "Slug cannot be empty".to_string(),
                ));
            }
            if slug != article.slug && self.repo.exists_by_slug(&slug, Some(id)).await? {
                return Err(ArticleServiceError::DuplicateSlug(slug));
            }
            article.slug = slug;
        }
        if let Some(locale) = input.locale {
            article.locale = self.resolve_locale(Some(&locale))?;
        }
        if let Some(content) = input.content {
            if content.trim().is_empty() {
                return Err(ArticleServiceError::ValidationError(
                    "Content cannot be empty".to_string(),
                ));
            }
            article.content_html = self.renderer.render(&content);
            article.content = content;
        }
        if let Some(excerpt) = input.excerpt {
            article.excerpt = clean_optional(Some(&excerpt))
                .or_else(|| Some(self.renderer.excerpt(&article.content)).filter(|e| !e.is_empty()));
        }
        if let Some(cover_image) = input.cover_image {
            article.cover_image = validate_cover(Some(&cover_image))?;
        }
        if let Some(status) = input.status {
            article.status = status;
            // First publication sticks
            if status == ArticleStatus::Published && article.published_at.is_none() {
                article.published_at = Some(Utc::now());
            }
        }

        let article = self.repo.update(&article).await?;
        tracing::info!(article_id = article.id, "Article updated");
        Ok(article)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), ArticleServiceError> {
        let article = self.get(id).await?;
        self.check_owner(actor, &article)?;

        self.repo.delete(id).await?;
        tracing::info!(article_id = id, "Article deleted");
        Ok(())
    }

    pub async fn count_by_status(&self, status: ArticleStatus) -> Result<i64, ArticleServiceError> {
        Ok(self.repo.count_by_status(status).await?)
    }

    fn check_owner(&self, actor: &User, article: &Article) -> Result<(), ArticleServiceError> {
        if actor.can_edit_article(article.author_id) {
            Ok(())
        } else {
            Err(ArticleServiceError::Forbidden(
                "You can only modify your own articles".to_string(),
            ))
        }
    }

    fn resolve_locale(&self, locale: Option<&str>) -> Result<String, ArticleServiceError> {
        let locale = match locale.map(str::trim).filter(|l| !l.is_empty()) {
            Some(locale) => locale.to_lowercase(),
            None => return Ok(self.default_locale.clone()),
        };
        if self.locales.iter().any(|l| *l == locale) {
            Ok(locale)
        } else {
            Err(ArticleServiceError::ValidationError(format!(
                "Unsupported locale: {}",
                locale
            )))
        }
    }

    /// Slug from the title, with `-2`, `-3`, ... appended until free
    async fn unique_slug(&self, title: &str, exclude_id: Option<i64>) -> Result<String, ArticleServiceError> {
        let base = slugify(title);
        if base.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Cannot generate a slug from the title".to_string(),
            ));
        }
        if !self.repo.exists_by_slug(&base, exclude_id).await? {
            return Ok(base);
        }

        for n in 2..=MAX_SLUG_SUFFIX {
            let candidate = format!("{}-{}", base, n);
            if !self.repo.exists_by_slug(&candidate, exclude_id).await? {
                return Ok(candidate);
            }
        }
        Err(ArticleServiceError::DuplicateSlug(base))
    }
}

fn validate_cover(url: Option<&str>) -> Result<Option<String>, ArticleServiceError> {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
        None => Ok(None),
        Some(url) if is_safe_url(url) => Ok(Some(url.to_string())),
        Some(_) => Err(ArticleServiceError::ValidationError(
            "Cover image URL is not allowed".to_string(),
        )),
    }
}
