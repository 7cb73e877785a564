//! Groq API client for LLM completions.

use super::{ChatBackend, CompletionOptions, ErrorKind, LlmError, Message};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// Groq API client.
#[derive(Debug, Clone)]
pub struct GroqClient {
    api_key: String,
    model: String,
    url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: ResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

impl GroqClient {
    /// Create a new Groq client against the public endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Create a client for any OpenAI-compatible base URL.
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl AsRef<str>,
    ) -> Self {
        let base = base_url.as_ref().trim_end_matches('/');
        Self {
            api_key: api_key.into(),
            model: model.into(),
            url: format!("{base}/chat/completions"),
            client: reqwest::Client::new(),
        }
    }

    /// Turn a non-success response into a classified [`LlmError`].
    async fn api_error(response: reqwest::Response) -> LlmError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: Option<Value> = serde_json::from_str(&text).ok();

        let detail = body
            .as_ref()
            .and_then(|b| serde_json::from_value::<ErrorResponse>(b.clone()).ok())
            .map(|r| r.error);

        let message = detail
            .as_ref()
            .and_then(|d| d.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
        let code = detail
            .as_ref()
            .and_then(|d| d.code.as_deref().or(d.error_type.as_deref()));

        let kind = classify(status, &message, code);
        warn!(status = status.as_u16(), ?kind, %message, "Groq API error");

        LlmError::Api {
            kind,
            status: status.as_u16(),
            message,
            body,
        }
    }

    /// POST one request and return the first choice's content, if any.
    async fn send(&self, request: ChatRequest<'_>) -> Result<Option<String>, LlmError> {
        debug!(model = %self.model, url = %self.url, "calling chat completions");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Invalid response body: {}", e)))?;

        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content))
    }
}

#[async_trait]
impl ChatBackend for GroqClient {
    /// Send a chat completion request.
    async fn complete(
        &self,
        messages: Vec<Message>,
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: Some(options.temperature),
            max_tokens: options.max_tokens,
        };

        self.send(request)
            .await?
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::Parse("No response content received from Groq".to_string()))
    }

    async fn ping(
        &self,
        messages: Vec<Message>,
        max_tokens: u32,
    ) -> Result<Option<String>, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: None,
            max_tokens,
        };
        self.send(request).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Decide the [`ErrorKind`] of a failed upstream call.
///
/// `insufficient_quota` is checked first so it is never shadowed by the
/// broader "quota" match. Text matches are case-insensitive; the status code
/// is the fallback when the message says nothing useful.
pub fn classify(status: StatusCode, message: &str, code: Option<&str>) -> ErrorKind {
    let message = message.to_lowercase();
    let code = code.map(str::to_lowercase).unwrap_or_default();

    if code == "insufficient_quota" || message.contains("insufficient_quota") {
        ErrorKind::QuotaExceeded
    } else if message.contains("api key")
        || message.contains("authentication")
        || status == StatusCode::UNAUTHORIZED
    {
        ErrorKind::Unauthorized
    } else if message.contains("rate limit") || status == StatusCode::TOO_MANY_REQUESTS {
        ErrorKind::RateLimited
    } else if message.contains("quota")
        || message.contains("billing")
        || status == StatusCode::PAYMENT_REQUIRED
    {
        ErrorKind::QuotaLimited
    } else {
        ErrorKind::Upstream
    }
}
