//! Public file serving for uploads
//!
//! - GET /uploads/{*path} - streamed, with range and conditional request
//!   support from `ServeFile`

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use tower_http::services::ServeFile;

use crate::api::middleware::{ApiError, AppState};
use crate::api::validation::Path;

/// Decode and check a requested path. Returns `None` for anything that could
/// leave the uploads directory.
pub fn sanitize_path(raw: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(raw).ok()?;
    let path = decoded.as_ref();

    if path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.contains('\0')
        || path.contains(':')
    {
        return None;
    }
    if path.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return None;
    }

    Some(PathBuf::from(path))
}

pub async fn serve_upload(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let relative = sanitize_path(&path)
        .ok_or_else(|| ApiError::validation_error("Invalid file path"))?;
    let file = state.config.upload.path.join(&relative);

    let is_file = tokio::fs::metadata(&file)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ApiError::not_found("File not found"));
    }

    let served = ServeFile::new(&file).try_call(request).await.map_err(|e| {
        tracing::error!("Failed to serve {}: {}", file.display(), e);
        ApiError::internal_error()
    })?;
    if served.status() == StatusCode::NOT_FOUND {
        return Err(ApiError::not_found("File not found"));
    }

    let mut response = served.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type(&path)),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    // Uploaded documents never run script in the site's origin
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("sandbox"),
    );
    Ok(response)
}

/// Content type from file extension
fn content_type(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
