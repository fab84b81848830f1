//! Lead pipeline endpoints (ADMIN, SALES)
//!
//! - GET /api/admin/leads - `status` filter
//! - GET/PUT/DELETE /api/admin/leads/{id} - delete is ADMIN only
//! - GET/POST /api/admin/leads/{id}/interactions

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::common::{default_page, default_per_page, double_option};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::validation::{Path, Query, ValidatedJson};
use crate::models::{
    Interaction, InteractionKind, Lead, LeadStatus, ListParams, NewActivity, PagedResult,
    UpdateLeadInput,
};

#[derive(Debug, Deserialize)]
pub struct LeadListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateLeadRequest {
    pub status: Option<LeadStatus>,
    /// `null` unassigns
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<i64>>,
    #[validate(length(max = 10000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct InteractionRequest {
    pub kind: InteractionKind,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

/// GET /api/admin/leads
pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadListQuery>,
) -> Result<Json<PagedResult<Lead>>, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            LeadStatus::parse(s)
                .ok_or_else(|| ApiError::validation_error(format!("Invalid status: {}", s)))?,
        ),
        None => None,
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.lead_service.list(status, &params).await?))
}

/// GET /api/admin/leads/{id}
pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Lead>, ApiError> {
    Ok(Json(state.lead_service.get(id).await?))
}

/// PUT /api/admin/leads/{id}
pub async fn update_lead(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateLeadRequest>,
) -> Result<Json<Lead>, ApiError> {
    let lead = state
        .lead_service
        .update(
            id,
            UpdateLeadInput {
                status: body.status,
                assigned_to: body.assigned_to,
                notes: body.notes,
            },
        )
        .await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(user.0.id), "lead.update", "lead")
                .with_resource_id(lead.id)
                .with_details(serde_json::json!({
                    "status": lead.status,
                    "assigned_to": lead.assigned_to,
                }))
                .with_ip(ip.0),
        )
        .await;

    Ok(Json(lead))
}

/// DELETE /api/admin/leads/{id}
pub async fn delete_lead(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin access required"));
    }

    state.lead_service.delete(id).await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(user.0.id), "lead.delete", "lead")
                .with_resource_id(id)
                .with_ip(ip.0),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/leads/{id}/interactions
pub async fn list_interactions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Interaction>>, ApiError> {
    Ok(Json(state.lead_service.interactions(id).await?))
}

/// POST /api/admin/leads/{id}/interactions
pub async fn add_interaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<InteractionRequest>,
) -> Result<(StatusCode, Json<Interaction>), ApiError> {
    let interaction = state
        .lead_service
        .add_interaction(id, &user.0, body.kind, &body.content)
        .await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(user.0.id), "lead.interaction", "lead")
                .with_resource_id(id)
                .with_details(serde_json::json!({ "kind": interaction.kind }))
                .with_ip(ip.0),
        )
        .await;

    Ok((StatusCode::CREATED, Json(interaction)))
}
