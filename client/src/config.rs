// Configuration for the interactive client

use std::time::Duration;

use crate::clipboard::COPY_CONFIRMATION;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    /// Delay before progress returns to 0 after a request ends
    pub reset_delay: Duration,
    pub copy_confirmation: Duration,
    pub connect_timeout: Duration,
    /// Optional bound on the whole request, body included
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8085".to_string(),
            reset_delay: Duration::from_millis(500),
            copy_confirmation: COPY_CONFIRMATION,
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.server_url.trim_end_matches('/'))
    }
}
