//! Client-side chat session: the transcript and the send/wait/fail state
//! machine that drives `/api/ask`.

use crate::routes::{ErrorBody, GuessRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Secret the bundled front ends play with.
pub const DEFAULT_HIDDEN_FLAG: &str = "France";

pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";
pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One line of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Where the session is in its request cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Idle,
    /// One request is outstanding; further submits are ignored.
    Sending,
    /// Last request failed; the message is shown as a dismissible banner.
    Error(String),
}

/// Error type for talking to the ask endpoint.
#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer; carries the server's `error` text when it sent one.
    #[error("{message}")]
    Status { status: u16, message: String },
}

/// Something that can deliver a [`GuessRequest`] and bring back the reply.
#[async_trait]
pub trait AskTransport: Send + Sync {
    async fn ask(&self, request: &GuessRequest) -> Result<String, AskError>;
}

/// Success body as the client reads it: a missing or null `reply` is an
/// empty reply, not a decoding failure.
#[derive(Debug, Deserialize)]
struct ReplyBody {
    #[serde(default)]
    reply: Option<String>,
}

/// [`AskTransport`] over HTTP against a running flagchat server.
#[derive(Debug, Clone)]
pub struct HttpAskTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpAskTransport {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        let base = base_url.as_ref().trim_end_matches('/');
        Self {
            url: format!("{base}/api/ask"),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AskTransport for HttpAskTransport {
    async fn ask(&self, request: &GuessRequest) -> Result<String, AskError> {
        let response = self.client.post(&self.url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .map(|b| b.error)
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            return Err(AskError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ReplyBody = response.json().await?;
        Ok(body.reply.unwrap_or_default())
    }
}

/// A single player's conversation with the game host.
pub struct ChatSession<T> {
    transport: T,
    hidden_flag: String,
    input: String,
    transcript: Vec<Turn>,
    state: ChatState,
}

impl<T: AskTransport> ChatSession<T> {
    pub fn new(transport: T, hidden_flag: impl Into<String>) -> Self {
        Self {
            transport,
            hidden_flag: hidden_flag.into(),
            input: String::new(),
            transcript: Vec::new(),
            state: ChatState::Idle,
        }
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == ChatState::Sending
    }

    /// Error text to show above the transcript, if any.
    pub fn banner(&self) -> Option<&str> {
        match &self.state {
            ChatState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Error -> Idle. No effect in other states.
    pub fn dismiss_banner(&mut self) {
        if matches!(self.state, ChatState::Error(_)) {
            self.state = ChatState::Idle;
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.is_loading() && !self.input.trim().is_empty()
    }

    /// First half of a submit: record the user's turn and enter `Sending`.
    ///
    /// Returns the request to send, or `None` when submitting is not allowed
    /// right now (a request is outstanding or the input is blank).
    pub fn begin_submit(&mut self) -> Option<GuessRequest> {
        if !self.can_submit() {
            debug!(state = ?self.state, "submit ignored");
            return None;
        }

        let text = std::mem::take(&mut self.input);
        self.transcript.push(Turn::user(text.clone()));
        self.state = ChatState::Sending;

        Some(GuessRequest {
            hidden_flag: self.hidden_flag.clone(),
            user_input: text,
        })
    }

    /// Second half of a submit: record the outcome and leave `Sending`.
    pub fn finish(&mut self, result: Result<String, AskError>) {
        match result {
            Ok(reply) => {
                let reply = if reply.is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    reply
                };
                self.transcript.push(Turn::assistant(reply));
                self.state = ChatState::Idle;
            }
            Err(e) => {
                warn!(error = %e, "ask request failed");
                self.transcript.push(Turn::assistant(ERROR_REPLY));
                self.state = ChatState::Error(e.to_string());
            }
        }
    }

    /// Submit the current input and wait for the answer.
    ///
    /// Returns `false` without touching the transport when submitting is not
    /// allowed.
    pub async fn submit(&mut self) -> bool {
        let Some(request) = self.begin_submit() else {
            return false;
        };
        let result = self.transport.ask(&request).await;
        self.finish(result);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport answering from a queue of canned results.
    #[derive(Default)]
    struct Canned {
        replies: Mutex<VecDeque<Result<String, String>>>,
        sent: Mutex<Vec<GuessRequest>>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn with(replies: Vec<Result<&str, &str>>) -> Self {
            let replies = replies
                .into_iter()
                .map(|r| r.map(str::to_string).map_err(str::to_string))
                .collect();
            Self {
                replies: Mutex::new(replies),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl AskTransport for Canned {
        async fn ask(&self, request: &GuessRequest) -> Result<String, AskError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().unwrap().push(request.clone());
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("no canned reply".to_string()));
            next.map_err(|message| AskError::Status {
                status: 500,
                message,
            })
        }
    }

    #[tokio::test]
    async fn successful_turn() {
        let mut chat = ChatSession::new(Canned::with(vec![Ok("It has three colors")]), "France");
        chat.set_input("What colors?");

        assert!(chat.submit().await);
        assert_eq!(
            chat.transcript(),
            &[Turn::user("What colors?"), Turn::assistant("It has three colors")]
        );
        assert_eq!(chat.state(), &ChatState::Idle);
        assert_eq!(chat.input(), "");
        assert!(chat.banner().is_none());

        let sent = chat.transport.sent.lock().unwrap();
        assert_eq!(
            sent[0],
            GuessRequest {
                hidden_flag: "France".into(),
                user_input: "What colors?".into(),
            }
        );
    }

    #[tokio::test]
    async fn failure_adds_fallback_turn_and_banner() {
        let mut chat = ChatSession::new(
            Canned::with(vec![Err("Service temporarily unavailable. Please try again later.")]),
            "France",
        );
        chat.set_input("Is it Italy?");

        assert!(chat.submit().await);
        assert_eq!(chat.transcript()[1], Turn::assistant(ERROR_REPLY));
        assert_eq!(
            chat.banner(),
            Some("Service temporarily unavailable. Please try again later.")
        );
        assert!(!chat.is_loading());

        chat.dismiss_banner();
        assert_eq!(chat.state(), &ChatState::Idle);
    }

    #[tokio::test]
    async fn blank_input_is_not_sent() {
        let mut chat = ChatSession::new(Canned::default(), "France");
        chat.set_input("   ");

        assert!(!chat.submit().await);
        assert!(chat.transcript().is_empty());
        assert_eq!(chat.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn submit_while_sending_is_ignored() {
        let mut chat = ChatSession::new(Canned::default(), "France");
        chat.set_input("What colors?");
        let first = chat.begin_submit();
        assert!(first.is_some());
        assert!(chat.is_loading());

        chat.set_input("Is it France?");
        assert!(!chat.can_submit());
        assert!(chat.begin_submit().is_none());
        // Input is kept, not buffered as a second request.
        assert_eq!(chat.input(), "Is it France?");
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.transport.calls.load(Ordering::SeqCst), 0);

        chat.finish(Ok("Three colors".into()));
        assert!(chat.can_submit());
    }

    #[tokio::test]
    async fn empty_reply_uses_placeholder() {
        let mut chat = ChatSession::new(Canned::with(vec![Ok("")]), "France");
        chat.set_input("hello");
        chat.submit().await;
        assert_eq!(chat.transcript()[1], Turn::assistant(EMPTY_REPLY));
    }

    #[tokio::test]
    async fn submit_from_error_state_clears_banner() {
        let mut chat = ChatSession::new(Canned::with(vec![Err("boom"), Ok("Yes")]), "France");
        chat.set_input("first");
        chat.submit().await;
        assert!(chat.banner().is_some());

        chat.set_input("second");
        assert!(chat.submit().await);
        assert!(chat.banner().is_none());
        assert_eq!(chat.transcript().len(), 4);
    }

    #[test]
    fn dismiss_outside_error_is_noop() {
        let mut chat = ChatSession::new(Canned::default(), "France");
        chat.set_input("x");
        chat.begin_submit();
        chat.dismiss_banner();
        assert_eq!(chat.state(), &ChatState::Sending);
    }
}
