//! The flag game host: turns a player's message into an LLM prompt and
//! returns the model's answer.

use crate::llm::{ChatBackend, CompletionOptions, LlmError, Message};
use std::sync::Arc;
use tracing::debug;

const PROMPT_TEMPLATE: &str = include_str!("../resources/prompt.md");

const PING_PROMPT: &str = "Say 'Groq API test successful'";
const PING_MAX_TOKENS: u32 = 10;

/// Game host backed by a chat-completion API.
///
/// Holds no per-game state: every call rebuilds the full prompt from the
/// secret and the player's input.
#[derive(Clone)]
pub struct FlagHost {
    backend: Arc<dyn ChatBackend>,
    options: CompletionOptions,
}

impl FlagHost {
    pub fn new(backend: Arc<dyn ChatBackend>, options: CompletionOptions) -> Self {
        Self { backend, options }
    }

    /// Answer one player turn about the flag of `hidden_flag`.
    ///
    /// Deciding whether the input is a question or a guess is left to the
    /// model; nothing here inspects the input beyond the emptiness check.
    pub async fn get_reply(&self, hidden_flag: &str, user_input: &str) -> Result<String, LlmError> {
        if hidden_flag.trim().is_empty() {
            return Err(LlmError::InvalidInput("hidden flag is empty".to_string()));
        }
        if user_input.trim().is_empty() {
            return Err(LlmError::InvalidInput("user input is empty".to_string()));
        }

        let prompt = build_prompt(hidden_flag, user_input);
        debug!(model = self.backend.model(), input = user_input, "asking game host");

        let reply = self
            .backend
            .complete(vec![Message::user(prompt)], self.options)
            .await?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(LlmError::Parse("No response content received".to_string()));
        }
        Ok(reply.to_string())
    }

    /// Minimal round trip used to check upstream connectivity. A reply with
    /// no text still counts as reachable.
    pub async fn ping(&self) -> Result<Option<String>, LlmError> {
        self.backend
            .ping(vec![Message::user(PING_PROMPT)], PING_MAX_TOKENS)
            .await
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }
}

/// Fill the prompt template. The input goes in last so text typed by the
/// player is never itself treated as a placeholder.
fn build_prompt(hidden_flag: &str, user_input: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{hidden_flag}", hidden_flag)
        .replace("{user_input}", user_input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ErrorKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend that records what it was sent and answers with a fixed result.
    struct Scripted {
        reply: Result<String, ErrorKind>,
        sent: Mutex<Vec<(Vec<Message>, CompletionOptions)>>,
        pinged: Mutex<Vec<(Vec<Message>, u32)>>,
    }

    impl Scripted {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                sent: Mutex::default(),
                pinged: Mutex::default(),
            })
        }

        fn failing(kind: ErrorKind) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(kind),
                sent: Mutex::default(),
                pinged: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        async fn complete(
            &self,
            messages: Vec<Message>,
            options: CompletionOptions,
        ) -> Result<String, LlmError> {
            self.sent.lock().unwrap().push((messages, options));
            self.reply.clone().map_err(|kind| LlmError::Api {
                kind,
                status: 500,
                message: "scripted".into(),
                body: None,
            })
        }

        async fn ping(
            &self,
            messages: Vec<Message>,
            max_tokens: u32,
        ) -> Result<Option<String>, LlmError> {
            self.pinged.lock().unwrap().push((messages, max_tokens));
            Ok(self.reply.clone().ok())
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn prompt_embeds_secret_and_input() {
        let prompt = build_prompt("France", "What colors?");
        assert!(prompt.contains("The hidden flag belongs to France."));
        assert!(prompt.contains("Player said: \"What colors?\""));
        assert!(!prompt.contains("{hidden_flag}"));
        assert!(!prompt.contains("{user_input}"));
    }

    #[test]
    fn player_text_is_not_expanded() {
        let prompt = build_prompt("France", "is it {hidden_flag}?");
        assert!(prompt.contains("Player said: \"is it {hidden_flag}?\""));
    }

    #[tokio::test]
    async fn reply_is_trimmed_and_sent_as_single_user_message() {
        let backend = Scripted::ok("  It has three colors \n");
        let host = FlagHost::new(backend.clone(), CompletionOptions::default());

        let reply = host.get_reply("France", "What colors?").await.unwrap();
        assert_eq!(reply, "It has three colors");

        let sent = backend.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (messages, options) = &sent[0];
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert!(messages[0].content.contains("France"));
        assert_eq!(options.max_tokens, 150);
    }

    #[tokio::test]
    async fn empty_inputs_never_reach_backend() {
        let backend = Scripted::ok("unused");
        let host = FlagHost::new(backend.clone(), CompletionOptions::default());

        let err = host.get_reply("", "What colors?").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = host.get_reply("France", "   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(backend.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn whitespace_reply_is_malformed() {
        let host = FlagHost::new(Scripted::ok(" \n "), CompletionOptions::default());
        let err = host.get_reply("France", "hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn backend_kind_propagates() {
        let host = FlagHost::new(
            Scripted::failing(ErrorKind::RateLimited),
            CompletionOptions::default(),
        );
        let err = host.get_reply("France", "hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn ping_uses_small_token_budget() {
        let backend = Scripted::ok("Groq API test successful");
        let host = FlagHost::new(backend.clone(), CompletionOptions::default());

        assert_eq!(
            host.ping().await.unwrap().as_deref(),
            Some("Groq API test successful")
        );
        assert!(backend.sent.lock().unwrap().is_empty());
        let pinged = backend.pinged.lock().unwrap();
        assert_eq!(pinged[0].1, 10);
        assert_eq!(pinged[0].0[0].content, PING_PROMPT);
    }
}
