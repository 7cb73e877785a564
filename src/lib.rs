//! flagchat - a flag guessing game hosted by an LLM.
//!
//! The server exposes `POST /api/ask`, which forwards each player turn to a
//! Groq chat-completion model, and a small chat page. [`chat`] holds the
//! client-side session used by the terminal front end.

pub mod chat;
pub mod config;
pub mod game;
pub mod llm;
pub mod routes;
pub mod state;

pub use chat::{AskError, AskTransport, ChatSession, ChatState, HttpAskTransport, Speaker, Turn};
pub use config::{Config, LlmConfig};
pub use game::FlagHost;
pub use llm::{ChatBackend, CompletionOptions, ErrorKind, GroqClient, LlmError, Message};
pub use routes::{router, ApiError, AskReply, ErrorBody, GuessRequest};
pub use state::{AppState, SharedState};

/// Install the global `tracing` subscriber used by both binaries.
///
/// `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
