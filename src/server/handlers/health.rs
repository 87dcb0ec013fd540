use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::config::defaults::BANNER;

pub async fn index() -> &'static str {
    BANNER
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
