//! Activity log endpoint (ADMIN)
//!
//! - GET /api/admin/activity - `resource` and `user_id` filters, newest first

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::common::{default_page, default_per_page};
use crate::api::middleware::{ApiError, AppState};
use crate::api::validation::Query;
use crate::models::{ActivityFilter, ActivityLog, ListParams, PagedResult};

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub resource: Option<String>,
    pub user_id: Option<i64>,
}

pub async fn list_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<PagedResult<ActivityLog>>, ApiError> {
    let filter = ActivityFilter {
        resource: query.resource,
        user_id: query.user_id,
    };
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.activity_service.list(&filter, &params).await?))
}
