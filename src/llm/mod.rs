//! LLM provider integrations for flagchat.

mod groq;

pub use groq::{classify, GroqClient, DEFAULT_BASE_URL, DEFAULT_MODEL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat message for LLM API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM completion options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 150,
        }
    }
}

/// Anything that can turn a list of messages into a reply.
///
/// [`GroqClient`] is the production implementation; handlers and the game
/// host only ever see this trait so tests can swap in a fake.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<Message>,
        options: CompletionOptions,
    ) -> Result<String, LlmError>;

    /// Bare round trip for connectivity checks: sends only `max_tokens`, no
    /// sampling options, and a reply without text is `Ok(None)`.
    async fn ping(&self, messages: Vec<Message>, max_tokens: u32)
        -> Result<Option<String>, LlmError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// What went wrong, decided once where the failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential rejected (401, "invalid API key", ...).
    Unauthorized,
    /// Upstream throttled the request.
    RateLimited,
    /// Account quota or billing limit reached.
    QuotaLimited,
    /// `insufficient_quota`: the account is out of quota entirely.
    QuotaExceeded,
    /// The HTTP call itself failed.
    Transport,
    /// Response arrived but carried no usable text.
    Malformed,
    /// Any other non-success upstream status.
    Upstream,
    /// Caller passed empty input.
    InvalidInput,
}

/// Error type for LLM operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api {
        kind: ErrorKind,
        status: u16,
        message: String,
        /// Raw upstream error body, when it was JSON.
        body: Option<Value>,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LlmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::Http(_) => ErrorKind::Transport,
            LlmError::Api { kind, .. } => *kind,
            LlmError::Parse(_) => ErrorKind::Malformed,
            LlmError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// Upstream error body if there was one, else the error text.
    pub fn details(&self) -> Value {
        match self {
            LlmError::Api {
                body: Some(body), ..
            } => body.clone(),
            other => serde_json::json!({ "message": other.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_follows_variant() {
        let api = LlmError::Api {
            kind: ErrorKind::RateLimited,
            status: 429,
            message: "slow down".into(),
            body: None,
        };
        assert_eq!(api.kind(), ErrorKind::RateLimited);
        assert_eq!(LlmError::Parse("x".into()).kind(), ErrorKind::Malformed);
        assert_eq!(
            LlmError::InvalidInput("x".into()).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn details_prefers_upstream_body() {
        let body = json!({ "error": { "message": "bad key" } });
        let err = LlmError::Api {
            kind: ErrorKind::Unauthorized,
            status: 401,
            message: "bad key".into(),
            body: Some(body.clone()),
        };
        assert_eq!(err.details(), body);

        let err = LlmError::Parse("No response from model".into());
        assert_eq!(
            err.details(),
            json!({ "message": "Parse error: No response from model" })
        );
    }

    #[test]
    fn message_serializes_with_role() {
        let value = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(value, json!({ "role": "user", "content": "hi" }));
    }
}
