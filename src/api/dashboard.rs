//! Backoffice dashboard counters (ADMIN, WRITER, SALES)
//!
//! - GET /api/admin/dashboard

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{ArticleStatus, LeadStatus};

#[derive(Debug, Serialize)]
pub struct ArticleCounts {
    pub draft: i64,
    pub published: i64,
    pub archived: i64,
}

#[derive(Debug, Serialize)]
pub struct LeadCounts {
    pub total: i64,
    pub new: i64,
    pub contacted: i64,
    pub qualified: i64,
    pub converted: i64,
    pub lost: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub articles: ArticleCounts,
    pub leads: LeadCounts,
    pub newsletter_subscribers: i64,
    pub users: i64,
}

pub async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let articles = &state.article_service;
    let leads = &state.lead_service;

    Ok(Json(DashboardResponse {
        articles: ArticleCounts {
            draft: articles.count_by_status(ArticleStatus::Draft).await?,
            published: articles.count_by_status(ArticleStatus::Published).await?,
            archived: articles.count_by_status(ArticleStatus::Archived).await?,
        },
        leads: LeadCounts {
            total: leads.count().await?,
            new: leads.count_by_status(LeadStatus::New).await?,
            contacted: leads.count_by_status(LeadStatus::Contacted).await?,
            qualified: leads.count_by_status(LeadStatus::Qualified).await?,
            converted: leads.count_by_status(LeadStatus::Converted).await?,
            lost: leads.count_by_status(LeadStatus::Lost).await?,
        },
        newsletter_subscribers: state.newsletter_service.count_active().await?,
        users: state.user_service.count().await?,
    }))
}
