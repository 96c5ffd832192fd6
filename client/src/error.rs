use thiserror::Error;

use crate::state::TransitionError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("clipboard command `{program}` exited with {status}")]
    CommandFailed { program: String, status: String },
}
