//! Article repository
//!
//! Database operations for articles. Listing supports locale, status and
//! author filters with pagination.

use crate::db::DbPool;
use crate::models::{Article, ArticleFilter, ArticleStatus, ListParams, NewArticle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

const ARTICLE_COLUMNS: &str = "id, slug, locale, title, excerpt, content, content_html, \
     cover_image, status, author_id, published_at, created_at, updated_at";

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn create(&self, article: &NewArticle) -> Result<Article>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// Persist every mutable field of `article`
    async fn update(&self, article: &Article) -> Result<Article>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// List articles matching `filter`, newest publication first
    async fn list(&self, filter: &ArticleFilter, params: &ListParams)
        -> Result<(Vec<Article>, i64)>;

    async fn count_by_status(&self, status: ArticleStatus) -> Result<i64>;

    /// Check if a slug is taken, optionally ignoring one article
    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DbPool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Append the WHERE clause for a filter
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ArticleFilter) {
    let mut separator = " WHERE ";

    if let Some(locale) = &filter.locale {
        qb.push(separator).push("locale = ").push_bind(locale.clone());
        separator = " AND ";
    }
    if let Some(status) = filter.status {
        qb.push(separator).push("status = ").push_bind(status.as_str());
        separator = " AND ";
    }
    if let Some(author_id) = filter.author_id {
        qb.push(separator).push("author_id = ").push_bind(author_id);
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &NewArticle) -> Result<Article> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO articles (slug, locale, title, excerpt, content, content_html,
                cover_image, status, author_id, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.slug)
        .bind(&article.locale)
        .bind(&article.title)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(&article.content_html)
        .bind(&article.cover_image)
        .bind(article.status.as_str())
        .bind(article.author_id)
        .bind(article.published_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create article")?;

        Ok(Article {
            id: result.last_insert_rowid(),
            slug: article.slug.clone(),
            locale: article.locale.clone(),
            title: article.title.clone(),
            excerpt: article.excerpt.clone(),
            content: article.content.clone(),
            content_html: article.content_html.clone(),
            cover_image: article.cover_image.clone(),
            status: article.status,
            author_id: article.author_id,
            published_at: article.published_at,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM articles WHERE id = ?",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get article by ID")?;

        row.as_ref().map(row_to_article).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM articles WHERE slug = ?",
            ARTICLE_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get article by slug")?;

        row.as_ref().map(row_to_article).transpose()
    }

    async fn update(&self, article: &Article) -> Result<Article> {
        sqlx::query(
            r#"
            UPDATE articles
            SET slug = ?, locale = ?, title = ?, excerpt = ?, content = ?, content_html = ?,
                cover_image = ?, status = ?, published_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&article.slug)
        .bind(&article.locale)
        .bind(&article.title)
        .bind(&article.excerpt)
        .bind(&article.content)
        .bind(&article.content_html)
        .bind(&article.cover_image)
        .bind(article.status.as_str())
        .bind(article.published_at)
        .bind(Utc::now())
        .bind(article.id)
        .execute(&self.pool)
        .await
        .context("Failed to update article")?;

        self.get_by_id(article.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Article not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete article")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        filter: &ArticleFilter,
        params: &ListParams,
    ) -> Result<(Vec<Article>, i64)> {
        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM articles");
        push_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count articles")?;

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM articles", ARTICLE_COLUMNS));
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY COALESCE(published_at, created_at) DESC, id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list articles")?;

        let articles = rows.iter().map(row_to_article).collect::<Result<Vec<_>>>()?;
        Ok((articles, total))
    }

    async fn count_by_status(&self, status: ArticleStatus) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM articles WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count articles by status")?;

        Ok(row.get("count"))
    }

    async fn exists_by_slug(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM articles WHERE slug = ? AND id != COALESCE(?, -1)",
        )
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check slug existence")?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }
}

fn row_to_article(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    let status_str: String = row.get("status");
    let status = ArticleStatus::parse(&status_str)
        .with_context(|| format!("Invalid article status in database: {}", status_str))?;

    Ok(Article {
        id: row.get("id"),
        slug: row.get("slug"),
        locale: row.get("locale"),
        title: row.get("title"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        cover_image: row.get("cover_image"),
        status,
        author_id: row.get("author_id"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Role, User};

    async fn setup_test_repo() -> (SqlxArticleRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "writer@studio.example".to_string(),
                "Writer".to_string(),
                "hash".to_string(),
                Role::Writer,
            ))
            .await
            .unwrap();

        (SqlxArticleRepository::new(pool), author.id)
    }

    fn new_article(slug: &str, locale: &str, status: ArticleStatus, author_id: i64) -> NewArticle {
        NewArticle {
            slug: slug.to_string(),
            locale: locale.to_string(),
            title: format!("Title {}", slug),
            excerpt: None,
            content: "# Hello".to_string(),
            content_html: "<h1>Hello</h1>".to_string(),
            cover_image: None,
            status,
            author_id,
            published_at: (status == ArticleStatus::Published).then(Utc::now),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, author_id) = setup_test_repo().await;
        let created = repo
            .create(&new_article("reel-2026", "en", ArticleStatus::Draft, author_id))
            .await
            .unwrap();

        assert!(created.id > 0);
        let by_slug = repo.get_by_slug("reel-2026").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);
        assert_eq!(by_slug.status, ArticleStatus::Draft);
        assert!(by_slug.published_at.is_none());

        assert!(repo.get_by_id(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_author_rejected_by_foreign_key() {
        let (repo, _) = setup_test_repo().await;
        let err = repo
            .create(&new_article("orphan", "en", ArticleStatus::Draft, 9999))
            .await
            .unwrap_err();
        let code = err
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .and_then(|e| e.code().map(|c| c.into_owned()));
        assert_eq!(code.as_deref(), Some("787"));
    }

    #[tokio::test]
    async fn test_list_filters_by_locale_and_status() {
        let (repo, author_id) = setup_test_repo().await;
        repo.create(&new_article("en-pub", "en", ArticleStatus::Published, author_id))
            .await
            .unwrap();
        repo.create(&new_article("ar-pub", "ar", ArticleStatus::Published, author_id))
            .await
            .unwrap();
        repo.create(&new_article("en-draft", "en", ArticleStatus::Draft, author_id))
            .await
            .unwrap();

        let params = ListParams::default();
        let (items, total) = repo
            .list(&ArticleFilter::published(Some("en".to_string())), &params)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].slug, "en-pub");

        let (_, total) = repo
            .list(&ArticleFilter::published(None), &params)
            .await
            .unwrap();
        assert_eq!(total, 2);

        let (_, total) = repo.list(&ArticleFilter::default(), &params).await.unwrap();
        assert_eq!(total, 3);

        let by_author = ArticleFilter {
            author_id: Some(author_id),
            ..Default::default()
        };
        let (items, _) = repo.list(&by_author, &ListParams::new(1, 2)).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (repo, author_id) = setup_test_repo().await;
        let mut article = repo
            .create(&new_article("motion", "en", ArticleStatus::Draft, author_id))
            .await
            .unwrap();

        article.status = ArticleStatus::Published;
        article.published_at = Some(Utc::now());
        article.title = "Motion design".to_string();
        let updated = repo.update(&article).await.unwrap();
        assert_eq!(updated.status, ArticleStatus::Published);
        assert!(updated.published_at.is_some());
        assert_eq!(repo.count_by_status(ArticleStatus::Published).await.unwrap(), 1);

        assert!(repo.delete(article.id).await.unwrap());
        assert!(repo.get_by_id(article.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_by_slug() {
        let (repo, author_id) = setup_test_repo().await;
        let article = repo
            .create(&new_article("taken", "en", ArticleStatus::Draft, author_id))
            .await
            .unwrap();

        assert!(repo.exists_by_slug("taken", None).await.unwrap());
        assert!(!repo.exists_by_slug("taken", Some(article.id)).await.unwrap());
        assert!(!repo.exists_by_slug("free", None).await.unwrap());
    }
}
