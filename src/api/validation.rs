//! Request extractors that reject with the JSON `ApiError` body: validated
//! JSON (validator crate), path parameters and query strings.

use axum::extract::{FromRequest, FromRequestParts, Json, Request};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::api::middleware::ApiError;

/// JSON body that has passed its `Validate` rules.
///
/// Malformed JSON, unknown fields and rule violations are all rejected as
/// 400 VALIDATION_ERROR; rule violations carry per-field messages.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct Subscribe {
///     #[validate(email)]
///     email: String,
/// }
///
/// async fn subscribe(ValidatedJson(body): ValidatedJson<Subscribe>) { /* ... */ }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation_error(rejection.body_text()))?;

        data.validate().map_err(validation_details)?;
        Ok(ValidatedJson(data))
    }
}

/// `axum::extract::Path` with a 400 VALIDATION_ERROR rejection
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

/// `axum::extract::Query` with a 400 VALIDATION_ERROR rejection
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

/// Field-level messages: `{"field": ["message", ...]}`
pub fn validation_details(errors: ValidationErrors) -> ApiError {
    let details = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<serde_json::Value> = errors
                .iter()
                .map(|err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                    serde_json::Value::String(message)
                })
                .collect();
            (field.to_string(), serde_json::Value::Array(messages))
        })
        .collect::<serde_json::Map<_, _>>();

    ApiError::with_details(
        "VALIDATION_ERROR",
        "Request validation failed",
        serde_json::Value::Object(details),
    )
}
