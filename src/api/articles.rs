//! Article API endpoints
//!
//! Public:
//! - GET /api/articles - published articles (`locale`, `page`, `per_page`)
//! - GET /api/articles/{slug} - published article by slug
//!
//! Admin (ADMIN, WRITER; writers only modify their own):
//! - GET/POST /api/admin/articles
//! - GET/PUT/DELETE /api/admin/articles/{id}

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::common::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::validation::{Path, Query, ValidatedJson};
use crate::models::{
    Article, ArticleFilter, ArticleStatus, ListParams, NewActivity, PagedResult,
    UpdateArticleInput,
};
use crate::services::CreateArticleInput;

#[derive(Debug, Deserialize)]
pub struct PublicArticleQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminArticleQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub locale: Option<String>,
    pub status: Option<String>,
    pub author_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 200))]
    pub slug: Option<String>,
    #[validate(length(max = 10))]
    pub locale: Option<String>,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1, max = 200000))]
    pub content: String,
    #[validate(length(max = 500))]
    pub cover_image: Option<String>,
    pub status: Option<ArticleStatus>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    #[validate(length(max = 10))]
    pub locale: Option<String>,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1, max = 200000))]
    pub content: Option<String>,
    #[validate(length(max = 500))]
    pub cover_image: Option<String>,
    pub status: Option<ArticleStatus>,
}

/// GET /api/articles
pub async fn list_public_articles(
    State(state): State<AppState>,
    Query(query): Query<PublicArticleQuery>,
) -> Result<Json<PagedResult<Article>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state
            .article_service
            .list_public(query.locale.as_deref(), &params)
            .await?,
    ))
}

/// GET /api/articles/{slug}
pub async fn get_public_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.get_public_by_slug(&slug).await?))
}

/// GET /api/admin/articles
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<AdminArticleQuery>,
) -> Result<Json<PagedResult<Article>>, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            ArticleStatus::parse(s)
                .ok_or_else(|| ApiError::validation_error(format!("Invalid status: {}", s)))?,
        ),
        None => None,
    };
    let filter = ArticleFilter {
        locale: query.locale.map(|l| l.to_lowercase()),
        status,
        author_id: query.author_id,
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state.article_service.list_admin(&filter, &params).await?,
    ))
}

/// POST /api/admin/articles
pub async fn create_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    ValidatedJson(body): ValidatedJson<CreateArticleRequest>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let article = state
        .article_service
        .create(
            &user.0,
            CreateArticleInput {
                title: body.title,
                slug: body.slug,
                locale: body.locale,
                excerpt: body.excerpt,
                content: body.content,
                cover_image: body.cover_image,
                status: body.status,
            },
        )
        .await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(user.0.id), "article.create", "article")
                .with_resource_id(article.id)
                .with_details(serde_json::json!({ "slug": article.slug, "status": article.status }))
                .with_ip(ip.0),
        )
        .await;

    Ok((StatusCode::CREATED, Json(article)))
}

/// GET /api/admin/articles/{id}
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.get(id).await?))
}

/// PUT /api/admin/articles/{id}
pub async fn update_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateArticleRequest>,
) -> Result<Json<Article>, ApiError> {
    let article = state
        .article_service
        .update(
            &user.0,
            id,
            UpdateArticleInput {
                slug: body.slug,
                locale: body.locale,
                title: body.title,
                excerpt: body.excerpt,
                content: body.content,
                cover_image: body.cover_image,
                status: body.status,
            },
        )
        .await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(user.0.id), "article.update", "article")
                .with_resource_id(article.id)
                .with_details(serde_json::json!({ "status": article.status }))
                .with_ip(ip.0),
        )
        .await;

    Ok(Json(article))
}

/// DELETE /api/admin/articles/{id}
pub async fn delete_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.article_service.delete(&user.0, id).await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(user.0.id), "article.delete", "article")
                .with_resource_id(id)
                .with_ip(ip.0),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
