//! Authentication API endpoints
//!
//! - POST /api/auth/login - verify credentials, set the session cookie
//! - POST /api/auth/logout - clear the session cookie
//! - GET /api/auth/me - current user

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};
use crate::api::validation::ValidatedJson;
use crate::models::{NewActivity, User};
use crate::services::UserServiceError;

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub expires_at: String,
}

/// Public auth routes
pub fn public_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Auth routes behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

fn session_cookie(token: &str, max_age: i64, secure: bool) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::from(anyhow::Error::new(e)))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ip: ClientIp,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.rate_limiter.check_login(&body.email, ip.key()).await?;

    let session = match state.user_service.login(&body.email, &body.password).await {
        Ok(session) => session,
        Err(e) => {
            if matches!(e, UserServiceError::AuthenticationError(_)) {
                state.rate_limiter.record_login_failure(&body.email).await;
                state
                    .activity_service
                    .record(
                        NewActivity::new(None, "auth.login_failed", "auth")
                            .with_details(serde_json::json!({ "email": body.email.to_lowercase() }))
                            .with_ip(ip.0.clone()),
                    )
                    .await;
            }
            return Err(e.into());
        }
    };

    state.rate_limiter.clear_login_failures(&body.email).await;
    state
        .activity_service
        .record(
            NewActivity::new(Some(session.user.id), "auth.login", "user")
                .with_resource_id(session.user.id)
                .with_ip(ip.0),
        )
        .await;

    let cookie = session_cookie(
        &session.token,
        state.user_service.session_ttl_seconds(),
        state.config.auth.cookie_secure,
    )?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, cookie);

    Ok((
        headers,
        Json(AuthResponse {
            user: session.user,
            token: session.token,
            expires_at: session.expires_at.to_rfc3339(),
        }),
    ))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; logging out clears the cookie.
async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
) -> Result<impl IntoResponse, ApiError> {
    state
        .activity_service
        .record(
            NewActivity::new(Some(user.0.id), "auth.logout", "user")
                .with_resource_id(user.0.id)
                .with_ip(ip.0),
        )
        .await;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie("", 0, state.config.auth.cookie_secure)?,
    );
    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /api/auth/me
async fn get_current_user(user: AuthenticatedUser) -> Json<User> {
    Json(user.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc.def", 3600, false).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "session=abc.def; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600"
        );

        let secure = session_cookie("abc.def", 3600, true).unwrap();
        assert!(secure.to_str().unwrap().ends_with("; Secure"));
    }
}
