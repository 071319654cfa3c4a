use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// Liveness plus whether the profile picture directory exists yet. The
/// directory is created on the first upload, so `missing` is not a failure.
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let uploads = match tokio::fs::metadata(state.user_service.uploads().dir()).await {
        Ok(meta) if meta.is_dir() => "ready",
        _ => "missing",
    };
    let body = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uploads": uploads,
    });
    (StatusCode::OK, Json(body))
}
