//! Pricing calculator endpoint
//!
//! - POST /api/pricing/estimate

use axum::{routing::post, Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::api::middleware::{ApiError, AppState};
use crate::api::validation::ValidatedJson;
use crate::services::pricing::{self, PricingEstimate};

/// Calculator input, shared with the contact form
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EstimateRequest {
    /// Project duration in minutes
    pub minutes: f64,
    /// 0 = pure motion graphics, 1 = heavy CGI/VFX
    pub complexity_factor: f64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/estimate", post(estimate))
}

async fn estimate(
    ValidatedJson(body): ValidatedJson<EstimateRequest>,
) -> Result<Json<PricingEstimate>, ApiError> {
    Ok(Json(pricing::estimate(body.minutes, body.complexity_factor)?))
}
