// Configuration for the generation server

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Time allowed until response headers are sent
    pub request_timeout_secs: u64,
    /// Upper bound on the whole streamed body, upstream open included
    pub stream_timeout_secs: u64,
    pub max_body_bytes: usize,
    pub cors_allowed_origins: Option<Vec<String>>,
    /// Language the generated posts are written in
    pub post_language: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            request_timeout_secs: 30,
            stream_timeout_secs: 120,
            max_body_bytes: 64 * 1024,
            cors_allowed_origins: None,
            post_language: "Ukrainian".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let stream_timeout_secs = std::env::var("STREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.stream_timeout_secs);

        let max_body_bytes = std::env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_body_bytes);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| parse_origins(&origins));

        let post_language = std::env::var("POST_LANGUAGE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.post_language);

        Self {
            port,
            request_timeout_secs,
            stream_timeout_secs,
            max_body_bytes,
            cors_allowed_origins,
            post_language,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }
}

fn parse_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
