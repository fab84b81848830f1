//! User management endpoints (ADMIN)
//!
//! - GET/POST /api/admin/users
//! - GET/PUT/DELETE /api/admin/users/{id}

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::validation::{Path, Query, ValidatedJson};
use crate::models::{CreateUserInput, NewActivity, PagedResult, Role, UpdateUserInput, User};

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResult<User>>, ApiError> {
    Ok(Json(state.user_service.list(&query.params()).await?))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    ip: ClientIp,
    ValidatedJson(body): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .user_service
        .create(CreateUserInput {
            email: body.email,
            name: body.name,
            password: body.password,
            role: body.role,
        })
        .await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(actor.0.id), "user.create", "user")
                .with_resource_id(user.id)
                .with_details(serde_json::json!({ "role": user.role }))
                .with_ip(ip.0),
        )
        .await;

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.get(id).await?))
}

/// PUT /api/admin/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let password_changed = body.password.is_some();
    let user = state
        .user_service
        .update(
            &actor.0,
            id,
            UpdateUserInput {
                email: body.email,
                name: body.name,
                password: body.password,
                role: body.role,
                is_active: body.is_active,
            },
        )
        .await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(actor.0.id), "user.update", "user")
                .with_resource_id(user.id)
                .with_details(serde_json::json!({
                    "role": user.role,
                    "is_active": user.is_active,
                    "password_changed": password_changed,
                }))
                .with_ip(ip.0),
        )
        .await;

    Ok(Json(user))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    actor: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.user_service.delete(&actor.0, id).await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(actor.0.id), "user.delete", "user")
                .with_resource_id(id)
                .with_ip(ip.0),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
