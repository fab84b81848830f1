//! Site settings endpoints
//!
//! - GET /api/settings - public subset
//! - GET /api/admin/settings - everything (ADMIN)
//! - PUT /api/admin/settings - partial update (ADMIN)

use axum::{extract::State, Json};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::validation::ValidatedJson;
use crate::models::NewActivity;
use crate::services::{PublicSettings, SettingsUpdate, SiteSettings};

/// GET /api/settings
pub async fn get_public_settings(
    State(state): State<AppState>,
) -> Result<Json<PublicSettings>, ApiError> {
    Ok(Json(state.settings_service.public_settings().await?))
}

/// GET /api/admin/settings
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SiteSettings>, ApiError> {
    Ok(Json(state.settings_service.all_settings().await?))
}

/// PUT /api/admin/settings
pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    ValidatedJson(body): ValidatedJson<SettingsUpdate>,
) -> Result<Json<SiteSettings>, ApiError> {
    let values = body.into_map();
    let mut changed: Vec<&str> = values.keys().map(String::as_str).collect();
    changed.sort_unstable();
    let details = serde_json::json!({ "keys": changed });

    let settings = state.settings_service.update(&values).await?;

    state
        .activity_service
        .record(
            NewActivity::new(Some(user.0.id), "settings.update", "settings")
                .with_details(details)
                .with_ip(ip.0),
        )
        .await;

    Ok(Json(settings))
}
