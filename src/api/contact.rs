//! Contact form endpoint
//!
//! - POST /api/contact - create a lead, optionally with a price estimate

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::middleware::{ApiError, AppState, ClientIp};
use crate::api::pricing::EstimateRequest;
use crate::api::validation::ValidatedJson;
use crate::models::NewActivity;
use crate::services::{ContactInput, PricingEstimate};

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub company: Option<String>,
    #[validate(length(max = 120))]
    pub service: Option<String>,
    #[validate(length(max = 120))]
    pub budget: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
    #[validate(length(max = 10))]
    pub locale: Option<String>,
    pub estimate: Option<EstimateRequest>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub lead_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<PricingEstimate>,
}

pub async fn submit_contact(
    State(state): State<AppState>,
    ip: ClientIp,
    ValidatedJson(body): ValidatedJson<ContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), ApiError> {
    state.rate_limiter.check_form(ip.key()).await?;

    let receipt = state
        .lead_service
        .submit_contact(ContactInput {
            name: body.name,
            email: body.email,
            phone: body.phone,
            company: body.company,
            service: body.service,
            budget: body.budget,
            message: body.message,
            locale: body.locale,
            estimate: body.estimate.map(|e| (e.minutes, e.complexity_factor)),
        })
        .await?;

    state
        .activity_service
        .record(
            NewActivity::new(None, "lead.create", "lead")
                .with_resource_id(receipt.lead.id)
                .with_ip(ip.0),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            lead_id: receipt.lead.id,
            estimate: receipt.estimate,
        }),
    ))
}
