//! Interactive client for the post generation service.
//!
//! A [`Session`] owns the UI state for one user, sends `POST /api/generate`
//! and renders the streamed body incrementally while driving a synthetic
//! progress indicator.

pub mod chunks;
pub mod clipboard;
pub mod config;
pub mod decode;
pub mod error;
pub mod request;
pub mod session;
pub mod state;

pub use clipboard::{Clipboard, CommandClipboard, CopyConfirmation, MemoryClipboard};
pub use config::ClientConfig;
pub use error::{ClientError, ClipboardError};
pub use request::Tone;
pub use session::{Outcome, Renderer, Session};
pub use state::{ClientState, Phase};
