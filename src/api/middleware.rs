//! API middleware
//!
//! Contains:
//! - Application state shared by every handler
//! - The `ApiError` taxonomy and its mapping from service errors
//! - Authentication (signed session token) and role authorization
//! - Client IP extraction and request statistics

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        ConnectInfo, FromRequestParts, Request, State,
    },
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::MemoryCache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxActivityRepository, SqlxArticleRepository, SqlxInteractionRepository,
    SqlxLeadRepository, SqlxNewsletterRepository, SqlxSettingsRepository, SqlxUserRepository,
};
use crate::db::DbPool;
use crate::models::{Role, User};
use crate::services::{
    ActivityService, ArticleService, ArticleServiceError, LeadService, LeadServiceError,
    NewsletterService, NewsletterServiceError, PricingError, RateLimited, RateLimiter,
    SessionSigner, SettingsService, SettingsServiceError, UserService, UserServiceError,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Sum of response times in microseconds
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Records request count and response time for every request
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state
        .request_stats
        .record(start.elapsed().as_micros() as u64);
    response
}

// ============================================================================
// Application State
// ============================================================================

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub article_service: Arc<ArticleService>,
    pub lead_service: Arc<LeadService>,
    pub newsletter_service: Arc<NewsletterService>,
    pub settings_service: Arc<SettingsService>,
    pub activity_service: Arc<ActivityService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DbPool, config: Config, signer: SessionSigner) -> Self {
        let locales = config.site.locales.clone();
        let default_locale = config.site.default_locale.clone();
        let settings_ttl = Duration::from_secs(config.cache.settings_ttl_seconds);

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let settings_cache = Arc::new(MemoryCache::new(settings_ttl));

        Self {
            user_service: Arc::new(UserService::new(user_repo.clone(), Arc::new(signer))),
            article_service: Arc::new(ArticleService::new(
                SqlxArticleRepository::boxed(pool.clone()),
                locales.clone(),
                default_locale.clone(),
            )),
            lead_service: Arc::new(LeadService::new(
                SqlxLeadRepository::boxed(pool.clone()),
                SqlxInteractionRepository::boxed(pool.clone()),
                user_repo,
                locales.clone(),
                default_locale.clone(),
            )),
            newsletter_service: Arc::new(NewsletterService::new(
                SqlxNewsletterRepository::boxed(pool.clone()),
                locales,
                default_locale,
            )),
            settings_service: Arc::new(SettingsService::new(
                SqlxSettingsRepository::boxed(pool.clone()),
                settings_cache,
                settings_ttl,
            )),
            activity_service: Arc::new(ActivityService::new(SqlxActivityRepository::boxed(
                pool.clone(),
            ))),
            rate_limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
            request_stats: Arc::new(RequestStats::new()),
            config: Arc::new(config),
            pool,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn rate_limited(retry_after: i64) -> Self {
        Self::with_details(
            "RATE_LIMITED",
            "Too many requests, please try again later",
            serde_json::json!({ "retry_after": retry_after }),
        )
    }

    /// Generic 500. The cause is logged, never sent to the client.
    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Path rejected: {}", rejection.body_text());
        ApiError::validation_error(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation_error(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = self
            .error
            .details
            .as_ref()
            .and_then(|d| d.get("retry_after"))
            .and_then(|v| v.as_i64());

        let mut response = (status, Json(self)).into_response();
        if let Some(seconds) = retry_after.filter(|_| status == StatusCode::TOO_MANY_REQUESTS) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

/// Map a database failure to a client error when the cause is a known
/// SQLite constraint (extended result codes) or a missing row.
fn classify_database_error(err: &anyhow::Error) -> Option<ApiError> {
    let sqlx_err = err.chain().find_map(|e| e.downcast_ref::<sqlx::Error>())?;
    if matches!(sqlx_err, sqlx::Error::RowNotFound) {
        return Some(ApiError::not_found("Resource not found"));
    }

    let code = sqlx_err.as_database_error()?.code()?;
    match code.as_ref() {
        // SQLITE_CONSTRAINT_UNIQUE, SQLITE_CONSTRAINT_PRIMARYKEY
        "2067" | "1555" => Some(ApiError::conflict("Resource already exists")),
        // SQLITE_CONSTRAINT_FOREIGNKEY
        "787" => Some(ApiError::validation_error(
            "Referenced resource does not exist",
        )),
        // SQLITE_CONSTRAINT_NOTNULL
        "1299" => Some(ApiError::validation_error("A required field is missing")),
        // SQLITE_CONSTRAINT_CHECK
        "275" => Some(ApiError::validation_error("A field has an invalid value")),
        _ => None,
    }
}

fn log_internal(err: &anyhow::Error) {
    #[cfg(debug_assertions)]
    tracing::error!("Internal error: {:?}", err);
    #[cfg(not(debug_assertions))]
    tracing::error!("Internal error: {}", err);
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        classify_database_error(&err).unwrap_or_else(|| {
            log_internal(&err);
            ApiError::internal_error()
        })
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(_) => {
                ApiError::unauthorized("Invalid email or password")
            }
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(_) => ApiError::conflict("Email is already in use"),
            UserServiceError::NotFound => ApiError::not_found("User not found"),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::NotFound(msg) => ApiError::not_found(msg),
            ArticleServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ArticleServiceError::DuplicateSlug(slug) => {
                ApiError::conflict(format!("Slug '{}' is already taken", slug))
            }
            ArticleServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ArticleServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<LeadServiceError> for ApiError {
    fn from(err: LeadServiceError) -> Self {
        match err {
            LeadServiceError::NotFound => ApiError::not_found("Lead not found"),
            LeadServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            LeadServiceError::Pricing(e) => e.into(),
            LeadServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<NewsletterServiceError> for ApiError {
    fn from(err: NewsletterServiceError) -> Self {
        match err {
            NewsletterServiceError::AlreadySubscribed(_) => {
                ApiError::conflict("Email is already subscribed")
            }
            NewsletterServiceError::NotFound => ApiError::not_found("Subscriber not found"),
            NewsletterServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<SettingsServiceError> for ApiError {
    fn from(err: SettingsServiceError) -> Self {
        match err {
            SettingsServiceError::InvalidKey(key) => {
                ApiError::validation_error(format!("Unknown setting: {}", key))
            }
            other => {
                log_internal(&anyhow::Error::new(other));
                ApiError::internal_error()
            }
        }
    }
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        let field = match err {
            PricingError::InvalidMinutes(_) => "minutes",
            PricingError::InvalidComplexity(_) => "complexity_factor",
        };
        let mut details = serde_json::Map::new();
        details.insert(field.to_string(), serde_json::json!([err.to_string()]));
        ApiError::with_details(
            "VALIDATION_ERROR",
            err.to_string(),
            serde_json::Value::Object(details),
        )
    }
}

impl From<RateLimited> for ApiError {
    fn from(err: RateLimited) -> Self {
        ApiError::rate_limited(err.retry_after)
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Session token from `Authorization: Bearer` or the `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_str) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|c| c.trim().strip_prefix("session="))
        .find(|t| !t.is_empty())
        .map(String::from)
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

fn check_role(request: &Request, allowed: &[Role]) -> Result<(), ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if allowed.contains(&user.0.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Insufficient permissions"))
    }
}

/// ADMIN only
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, &[Role::Admin])?;
    Ok(next.run(request).await)
}

/// ADMIN or WRITER
pub async fn require_writer(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, &[Role::Admin, Role::Writer])?;
    Ok(next.run(request).await)
}

/// ADMIN or SALES
pub async fn require_sales(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, &[Role::Admin, Role::Sales])?;
    Ok(next.run(request).await)
}

/// Any backoffice role
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, &[Role::Admin, Role::Writer, Role::Sales])?;
    Ok(next.run(request).await)
}

// ============================================================================
// Client IP
// ============================================================================

/// Client address: the socket peer, or the proxy headers when
/// `server.trust_proxy` is set
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    /// Key for per-IP rate limits
    pub fn key(&self) -> &str {
        self.0.as_deref().unwrap_or("unknown")
    }

    fn from_parts(parts: &Parts, trust_proxy: bool) -> Self {
        let forwarded = if trust_proxy {
            extract_ip_address(&parts.headers)
        } else {
            None
        };
        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
        ClientIp(ip)
    }
}

pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next().map(str::trim).filter(|ip| !ip.is_empty()) {
            return Some(ip.to_string());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(String::from)
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp::from_parts(parts, state.config.server.trust_proxy))
    }
}
