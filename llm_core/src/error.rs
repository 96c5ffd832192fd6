use thiserror::Error;

/// Errors raised while talking to the upstream generation service.
///
/// Callers relaying a stream treat every variant the same way: the stream
/// ends. The variants only exist so logs say what actually went wrong.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing configuration: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream stream error: {0}")]
    Upstream(String),

    #[error("malformed stream event: {0}")]
    Decode(String),
}
