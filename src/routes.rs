//! HTTP routes for flagchat: the ask endpoint, the connectivity check and the
//! embedded chat page.

use crate::llm::{ErrorKind, LlmError};
use crate::state::SharedState;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, warn};

const INDEX_HTML: &str = include_str!("../resources/index.html");

/// A validated, trimmed ask request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    pub hidden_flag: String,
    pub user_input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskReply {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Everything `/api/ask` can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON in request body")]
    InvalidJson(#[source] serde_json::Error),

    #[error("{0} is required and must be a string")]
    MissingField(&'static str),

    #[error("GROQ_API_KEY not configured")]
    NotConfigured,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl ApiError {
    /// Status code and public message. Internal detail stays in the logs.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::InvalidJson(_) | ApiError::MissingField(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::NotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "API configuration error".to_string(),
            ),
            ApiError::Llm(e) => {
                let (status, message) = match e.kind() {
                    ErrorKind::Unauthorized => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "AI service configuration error",
                    ),
                    ErrorKind::RateLimited => (
                        StatusCode::TOO_MANY_REQUESTS,
                        "Service temporarily unavailable. Please try again later.",
                    ),
                    ErrorKind::QuotaLimited => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Service temporarily unavailable due to quota limits",
                    ),
                    ErrorKind::QuotaExceeded => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Service quota exceeded. Please try again later.",
                    ),
                    ErrorKind::Transport
                    | ErrorKind::Malformed
                    | ErrorKind::Upstream
                    | ErrorKind::InvalidInput => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An unexpected error occurred. Please try again.",
                    ),
                };
                (status, message.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let chain = source_chain(&self);

        match &self {
            ApiError::InvalidJson(_) | ApiError::MissingField(_) => {
                warn!(error = %self, %chain, "rejected ask request");
            }
            ApiError::NotConfigured => {
                error!(error = %self, "API key missing, cannot serve ask request");
            }
            ApiError::Llm(e) => {
                error!(
                    error = %e,
                    kind = ?e.kind(),
                    status = status.as_u16(),
                    %chain,
                    "game host failed"
                );
            }
        }

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Render an error's `source()` chain as `a: b: c`.
fn source_chain(err: &dyn std::error::Error) -> String {
    let mut parts = Vec::new();
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}

/// Pull a required non-blank string field out of the request body.
fn required_str(body: &Value, field: &'static str) -> Result<String, ApiError> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingField(field))
}

/// Validate a raw request body. Checks run in order and stop at the first
/// failure.
pub fn parse_guess(body: &[u8]) -> Result<GuessRequest, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(ApiError::InvalidJson)?;
    let hidden_flag = required_str(&value, "hiddenFlag")?;
    let user_input = required_str(&value, "userInput")?;
    Ok(GuessRequest {
        hidden_flag,
        user_input,
    })
}

// ========== Game ==========

/// `POST /api/ask`
pub async fn ask(State(state): State<SharedState>, body: Bytes) -> Result<Json<AskReply>, ApiError> {
    let request = parse_guess(&body)?;

    let host = state.host.as_ref().ok_or(ApiError::NotConfigured)?;

    let reply = host
        .get_reply(&request.hidden_flag, &request.user_input)
        .await?;

    info!(model = host.model(), "answered player turn");
    Ok(Json(AskReply { reply }))
}

// ========== Diagnostics ==========

/// `GET /api/text-openai`: check the upstream API is reachable.
///
/// Always answers 200; failures are described in the body.
pub async fn text_openai(State(state): State<SharedState>) -> Json<Value> {
    let Some(host) = state.host.as_ref() else {
        warn!("connectivity check requested without API key");
        return Json(json!({
            "error": "GROQ_API_KEY not found in environment variables",
            "hasKey": false,
        }));
    };

    match host.ping().await {
        Ok(response) => Json(json!({
            "success": true,
            "message": "Groq API is working correctly",
            "response": response,
        })),
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "connectivity check failed");
            Json(json!({
                "error": "Groq API test failed",
                "details": e.details(),
            }))
        }
    }
}

// ========== Page ==========

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/ask", post(ask))
        .route("/api/text-openai", get(text_openai))
        .with_state(state)
}
