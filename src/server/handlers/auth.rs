use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::security::verify_placeholder_credentials;

/// Checks the single built-in account. Issues no token and grants nothing;
/// the frontend only uses the status code.
///
/// 400 only when a field is absent. Present fields that are not strings
/// (numbers, null) are a credential mismatch.
pub async fn login(payload: Option<Json<Value>>) -> impl IntoResponse {
    let body = payload.map(|Json(body)| body).unwrap_or(Value::Null);
    let (Some(username), Some(password)) = (body.get("username"), body.get("password")) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Missing username or password" })),
        );
    };

    let accepted = match (username.as_str(), password.as_str()) {
        (Some(username), Some(password)) => verify_placeholder_credentials(username, password),
        _ => false,
    };

    if accepted {
        tracing::info!("Login succeeded for {}", username);
        (StatusCode::OK, Json(json!({ "message": "Login successful" })))
    } else {
        tracing::warn!("Login rejected for {}", username);
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
    }
}
