use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Form, Json};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::{ApiError, GENERIC_INTERNAL_ERROR};
use crate::core::security::session_key;
use crate::rag::RagError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyForm {
    pub msg: Option<String>,
}

pub async fn chat(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    payload: Option<Json<ChatRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(message) = payload.and_then(|Json(req)| req.message) else {
        tracing::warn!("Chat request without a message");
        return Err(ApiError::BadRequest(
            "Missing 'message' in request body".to_string(),
        ));
    };

    let (jar, session) = session_key(jar);
    tracing::info!("User: {}", message.trim());

    let turn = state.pipeline.answer(&session, &message).await?;

    tracing::info!("Answer: {}", turn.answer);
    Ok((jar, Json(turn)))
}

/// Stored turns for the caller's session, oldest first. A new session
/// gets a cookie and an empty list.
pub async fn history(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let (jar, session) = session_key(jar);
    let history = state.pipeline.history(&session).await?;
    Ok((jar, Json(history)))
}

pub async fn clear(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let (jar, session) = session_key(jar);
    state.pipeline.clear(&session).await?;
    Ok((jar, Json(json!({ "message": "Conversation history cleared." }))))
}

/// Form endpoint kept for the old HTML chat page. Answers without
/// conversation memory and replies in plain text.
pub async fn legacy_form(
    State(state): State<AppState>,
    form: Option<Form<LegacyForm>>,
) -> (StatusCode, String) {
    let message = form.and_then(|Form(f)| f.msg).unwrap_or_default();

    match state.pipeline.answer_once(&message).await {
        Ok(answer) => {
            tracing::info!("Answer (form): {}", answer);
            (StatusCode::OK, answer)
        }
        Err(RagError::EmptyMessage) => {
            tracing::warn!("Empty form message received");
            (StatusCode::BAD_REQUEST, "Error: empty message".to_string())
        }
        Err(err) => {
            tracing::error!("Error handling /get request: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_INTERNAL_ERROR.to_string(),
            )
        }
    }
}
