//! Health check
//!
//! - GET /api/health - 200 when the database answers, 503 otherwise

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::process;
use sysinfo::{Pid, System};

use crate::api::middleware::AppState;
use crate::db;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded"
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
    pub os_name: String,
    pub uptime_seconds: u64,
    pub uptime_formatted: String,
    pub memory_bytes: u64,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match db::ping(&state.pool).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            false
        }
    };

    let memory_bytes = tokio::task::spawn_blocking(process_memory)
        .await
        .unwrap_or(0);

    let stats = &state.request_stats;
    let uptime_seconds = stats.uptime_seconds();
    let body = HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        version: APP_VERSION,
        os_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
        uptime_seconds,
        uptime_formatted: format_uptime(uptime_seconds),
        memory_bytes,
        total_requests: stats.total_requests(),
        avg_response_time_ms: stats.avg_response_time_us() / 1000.0,
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

fn process_memory() -> u64 {
    let sys = System::new_all();
    sys.process(Pid::from_u32(process::id()))
        .map(|p| p.memory())
        .unwrap_or(0)
}

fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
