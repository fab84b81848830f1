//! API layer - HTTP handlers and routing
//!
//! All endpoints speak JSON under `/api`, plus public file serving under
//! `/uploads`. Route groups share one role check each:
//! - public: auth login, health, pricing, contact, newsletter, articles, settings
//! - authenticated: logout, me
//! - staff (ADMIN, WRITER, SALES): dashboard
//! - ADMIN: users, settings, activity, newsletter removal
//! - ADMIN, WRITER: articles, uploads
//! - ADMIN, SALES: leads, interactions, newsletter list

pub mod activity;
pub mod articles;
pub mod auth;
pub mod common;
pub mod contact;
pub mod dashboard;
pub mod files;
pub mod health;
pub mod leads;
pub mod middleware;
pub mod newsletter;
pub mod pricing;
pub mod settings;
pub mod upload;
pub mod users;
pub mod validation;

#[cfg(test)]
mod tests;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, RequestStats};

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let upload_limit = usize::try_from(state.config.upload.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(upload::MULTIPART_OVERHEAD);

    // ADMIN only
    let admin_routes = Router::new()
        .route("/admin/users", get(users::list_users).post(users::create_user))
        .route(
            "/admin/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/admin/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route("/admin/activity", get(activity::list_activity))
        .route("/admin/newsletter/{id}", delete(newsletter::delete_subscriber))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // ADMIN, WRITER
    let writer_routes = Router::new()
        .route(
            "/admin/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        .route(
            "/admin/articles/{id}",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .route(
            "/admin/uploads",
            post(upload::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_writer))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // ADMIN, SALES (lead deletion checks for ADMIN in the handler)
    let sales_routes = Router::new()
        .route("/admin/leads", get(leads::list_leads))
        .route(
            "/admin/leads/{id}",
            get(leads::get_lead)
                .put(leads::update_lead)
                .delete(leads::delete_lead),
        )
        .route(
            "/admin/leads/{id}/interactions",
            get(leads::list_interactions).post(leads::add_interaction),
        )
        .route("/admin/newsletter", get(newsletter::list_subscribers))
        .route_layer(axum_middleware::from_fn(middleware::require_sales))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // ADMIN, WRITER, SALES
    let staff_routes = Router::new()
        .route("/admin/dashboard", get(dashboard::get_dashboard))
        .route_layer(axum_middleware::from_fn(middleware::require_staff))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Any signed-in user
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .route("/health", get(health::health_check))
        .nest("/pricing", pricing::router())
        .route("/contact", post(contact::submit_contact))
        .route("/newsletter", post(newsletter::subscribe))
        .route("/newsletter/unsubscribe", post(newsletter::unsubscribe))
        .route("/articles", get(articles::list_public_articles))
        .route("/articles/{slug}", get(articles::get_public_article))
        .route("/settings", get(settings::get_public_settings))
        .merge(admin_routes)
        .merge(writer_routes)
        .merge(sales_routes)
        .merge(staff_routes)
        .merge(protected_routes)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .route("/uploads/{*path}", get(files::serve_upload))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        // Outermost, runs for all requests
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}
