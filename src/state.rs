//! Application state shared across request handlers.

use crate::config::Config;
use crate::game::FlagHost;
use crate::llm::{ChatBackend, CompletionOptions, GroqClient};
use std::sync::Arc;

/// Read-only state built once at startup.
///
/// `host` is `None` when no API key is configured; handlers report that as a
/// configuration error instead of failing at startup.
#[derive(Clone, Default)]
pub struct AppState {
    pub host: Option<FlagHost>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let host = config.llm.groq_api_key.as_ref().map(|key| {
            let client = GroqClient::with_base_url(
                key.clone(),
                config.llm.groq_model.clone(),
                &config.llm.groq_base_url,
            );
            FlagHost::new(Arc::new(client), config.llm.options)
        });
        Self { host }
    }

    pub fn with_backend(backend: Arc<dyn ChatBackend>, options: CompletionOptions) -> Self {
        Self {
            host: Some(FlagHost::new(backend, options)),
        }
    }

    pub fn unconfigured() -> Self {
        Self::default()
    }
}

/// Thread-safe state wrapper.
pub type SharedState = Arc<AppState>;
