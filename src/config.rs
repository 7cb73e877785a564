//! Configuration management for flagchat.

use crate::llm::{CompletionOptions, DEFAULT_BASE_URL, DEFAULT_MODEL};
use configparser::ini::Ini;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address the HTTP server listens on.
    pub bind: String,
    pub llm: LlmConfig,
}

/// LLM configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub groq_base_url: String,
    pub options: CompletionOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_model: DEFAULT_MODEL.to_string(),
            groq_base_url: DEFAULT_BASE_URL.to_string(),
            options: CompletionOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file and the process
    /// environment.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path, |name| std::env::var(name).ok()),
            None => Self::default().with_env(|name| std::env::var(name).ok()),
        }
    }

    /// Load configuration from `path`, then apply overrides from `env`.
    ///
    /// A missing file is not an error; unreadable values are logged and left
    /// at their defaults.
    pub fn load_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if path.exists() {
            let mut ini = Ini::new();
            match ini.load(path) {
                Ok(_) => config.apply_ini(&ini),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to read config file"),
            }
        }

        config.with_env(env)
    }

    fn apply_ini(&mut self, ini: &Ini) {
        // [server] section
        if let Some(bind) = ini.get("server", "bind") {
            self.bind = bind;
        }

        // [llm] section
        if let Some(key) = ini.get("llm", "groq_api_key") {
            if !key.is_empty() {
                self.llm.groq_api_key = Some(key);
            }
        }
        if let Some(model) = ini.get("llm", "groq_model") {
            self.llm.groq_model = model;
        }
        if let Some(url) = ini.get("llm", "groq_base_url") {
            self.llm.groq_base_url = url;
        }
        match ini.getfloat("llm", "temperature") {
            Ok(Some(t)) => self.llm.options.temperature = t as f32,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "ignoring llm.temperature"),
        }
        match ini.getuint("llm", "max_tokens") {
            Ok(Some(n)) => match u32::try_from(n) {
                Ok(n) => self.llm.options.max_tokens = n,
                Err(_) => warn!(value = n, "llm.max_tokens out of range, ignoring"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "ignoring llm.max_tokens"),
        }
    }

    /// Environment variables win over the config file.
    fn with_env(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GROQ_API_KEY") {
            self.llm.groq_api_key = Some(key);
        }
        if let Some(model) = non_empty("GROQ_MODEL") {
            self.llm.groq_model = model;
        }
        if let Some(url) = non_empty("GROQ_BASE_URL") {
            self.llm.groq_base_url = url;
        }
        if let Some(bind) = non_empty("FLAGCHAT_BIND") {
            self.bind = bind;
        }
        self
    }

    /// Get the config file path.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("flagchat").join("settings.conf"))
    }
}

impl LlmConfig {
    /// Check if the Groq API key is present.
    pub fn is_configured(&self) -> bool {
        self.groq_api_key.is_some()
    }
}
