mod error;
pub mod sse;

use std::{env, pin::Pin, time::Duration};

use async_trait::async_trait;
use futures::Stream;
use reqwest::{header, Client};
use serde::Serialize;
use tracing::{debug, warn};

pub use error::LlmError;
pub use sse::decode_text_stream;

/// Ordered text deltas from one upstream generation call.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
// Keep error bodies short in logs
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    OpenAI,
}

impl LlmProvider {
    /// Anything unrecognised falls back to Anthropic.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => LlmProvider::OpenAI,
            _ => LlmProvider::Anthropic,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "claude-3-5-sonnet-20240620",
            LlmProvider::OpenAI => "gpt-4o-mini",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "https://api.anthropic.com",
            LlmProvider::OpenAI => "https://api.openai.com",
        }
    }

    fn api_key_var(self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Connection settings for the upstream generation service.
#[derive(Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl LlmConfig {
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            api_key: api_key.into(),
            base_url: provider.default_base_url().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Read settings from the environment. The API key is required.
    pub fn from_env() -> Result<Self, LlmError> {
        let provider = LlmProvider::from_name(
            &env::var("LLM_PROVIDER").unwrap_or_else(|_| "anthropic".into()),
        );

        let api_key = env::var(provider.api_key_var())
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LlmError::Config(format!("{} must be set in the environment", provider.api_key_var()))
            })?;

        let mut config = Self::new(provider, api_key);

        if let Ok(model) = env::var("LLM_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }

        if let Ok(url) = env::var("LLM_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim_end_matches('/').to_string();
            }
        }

        config.max_tokens = env::var("LLM_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        config.connect_timeout = env::var("LLM_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(config.connect_timeout);

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A system instruction plus a single user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Anything that can stream text for a prompt.
///
/// The server only depends on this trait, so tests can script the upstream.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn stream_text(&self, prompt: &Prompt) -> Result<TextStream, LlmError>;
}

/// Request body for the Anthropic messages API
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

/// Request body for OpenAI-compatible chat completions
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Create a client from `LLM_*` and provider key environment variables.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(LlmConfig::from_env()?)
    }

    pub fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn request(&self, prompt: &Prompt) -> reqwest::RequestBuilder {
        let config = &self.config;
        match config.provider {
            LlmProvider::Anthropic => self
                .http
                .post(format!("{}/v1/messages", config.base_url))
                .header("x-api-key", &config.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header(header::ACCEPT, "text/event-stream")
                .json(&MessagesRequest {
                    model: &config.model,
                    max_tokens: config.max_tokens,
                    system: &prompt.system,
                    messages: vec![Message { role: "user", content: &prompt.user }],
                    stream: true,
                }),
            LlmProvider::OpenAI => self
                .http
                .post(format!("{}/v1/chat/completions", config.base_url))
                .bearer_auth(&config.api_key)
                .header(header::ACCEPT, "text/event-stream")
                .json(&ChatRequest {
                    model: &config.model,
                    max_tokens: config.max_tokens,
                    messages: vec![
                        Message { role: "system", content: &prompt.system },
                        Message { role: "user", content: &prompt.user },
                    ],
                    stream: true,
                }),
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn stream_text(&self, prompt: &Prompt) -> Result<TextStream, LlmError> {
        debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            max_tokens = self.config.max_tokens,
            "opening upstream stream"
        );

        let response = self.request(prompt).send().await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            warn!(status = status.as_u16(), "upstream rejected generation request");
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        Ok(decode_text_stream(self.config.provider, response.bytes_stream()))
    }
}
