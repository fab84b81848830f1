//! Motionhouse server

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use motionhouse::{
    api::{self, AppState},
    config::Config,
    db,
    services::SessionSigner,
};

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "motionhouse=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Motionhouse...");

    let mut config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    if config.auth.session_secret.is_empty() {
        tracing::warn!("auth.session_secret is not set; generated a random one, sessions will not survive a restart");
        config.auth.session_secret = SessionSigner::generate_secret();
    }
    let signer = SessionSigner::new(
        config.auth.session_secret.as_bytes(),
        config.auth.session_ttl_hours,
    );

    tokio::fs::create_dir_all(&config.upload.path)
        .await
        .with_context(|| format!("Failed to create upload directory {:?}", config.upload.path))?;

    let bootstrap = (
        config.auth.bootstrap_admin_email.clone(),
        config.auth.bootstrap_admin_password.clone(),
    );
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(pool, config, signer);

    if let (Some(email), Some(password)) = bootstrap {
        state
            .user_service
            .ensure_bootstrap_admin(&email, &password)
            .await
            .context("Failed to create bootstrap admin")?;
    }

    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
            tracing::debug!("Rate limiter cleanup completed");
        }
    });

    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
