/*
 * Responsibility
 * - GET /health (liveness)
 * - Normally open-listed; also the smoke test for middleware ordering
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
