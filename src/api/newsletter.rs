//! Newsletter API endpoints
//!
//! Public:
//! - POST /api/newsletter - subscribe
//! - POST /api/newsletter/unsubscribe - deactivate
//!
//! Admin:
//! - GET /api/admin/newsletter - subscribers (ADMIN, SALES)
//! - DELETE /api/admin/newsletter/{id} - remove (ADMIN)

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::common::{default_page, default_per_page, OkResponse};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::validation::{Path, Query, ValidatedJson};
use crate::models::{ListParams, NewActivity, PagedResult, Subscriber};

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SubscribeRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 10))]
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UnsubscribeRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscriberListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub active: Option<bool>,
}

pub async fn subscribe(
    State(state): State<AppState>,
    ip: ClientIp,
    ValidatedJson(body): ValidatedJson<SubscribeRequest>,
) -> Result<(StatusCode, Json<Subscriber>), ApiError> {
    state.rate_limiter.check_form(ip.key()).await?;

    let subscriber = state
        .newsletter_service
        .subscribe(&body.email, body.locale.as_deref())
        .await?;

    state
        .activity_service
        .record(
            NewActivity::new(None, "newsletter.subscribe", "newsletter")
                .with_resource_id(subscriber.id)
                .with_ip(ip.0),
        )
        .await;

    Ok((StatusCode::CREATED, Json(subscriber)))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<UnsubscribeRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    state.newsletter_service.unsubscribe(&body.email).await?;
    Ok(Json(OkResponse::new()))
}

pub async fn list_subscribers(
    State(state): State<AppState>,
    Query(query): Query<SubscriberListQuery>,
) -> Result<Json<PagedResult<Subscriber>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(
        state.newsletter_service.list(query.active, &params).await?,
    ))
}

pub async fn delete_subscriber(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.newsletter_service.delete(id).await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(user.0.id), "newsletter.delete", "newsletter")
                .with_resource_id(id)
                .with_ip(ip.0),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
