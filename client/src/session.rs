use std::time::Instant;

use tracing::{debug, error, info};

use crate::chunks::ChunkReader;
use crate::clipboard::{Clipboard, CopyConfirmation};
use crate::config::ClientConfig;
use crate::decode::Utf8Decoder;
use crate::error::{ClientError, ClipboardError};
use crate::request::{ErrorBody, GenerateBody, Tone};
use crate::state::{ClientState, Phase};

/// Receives updates while a post is being generated.
pub trait Renderer {
    fn on_chunk(&mut self, _text: &str) {}
    fn on_progress(&mut self, _progress: u8) {}
    fn on_phase(&mut self, _phase: Phase) {}
}

impl Renderer for () {}

/// How a generate cycle ended. Failures are terminal for the cycle but
/// leave the session usable for the next one.
#[derive(Debug)]
pub enum Outcome {
    Completed,
    Failed(ClientError),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

pub struct Session {
    http: reqwest::Client,
    config: ClientConfig,
    state: ClientState,
    copied: Option<CopyConfirmation>,
}

impl Session {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            config,
            state: ClientState::default(),
            copied: None,
        })
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn set_source_text(&mut self, text: impl Into<String>) {
        self.state.source_text = text.into();
    }

    pub fn set_tone(&mut self, tone: Tone) {
        self.state.tone = tone;
    }

    /// Run one generate cycle against the orchestrator.
    ///
    /// Returns `Err` only when the trigger itself is refused (already
    /// loading, or no source text). Transport errors and rejected requests
    /// come back as [`Outcome::Failed`] after the state has settled.
    pub async fn generate(&mut self, renderer: &mut dyn Renderer) -> Result<Outcome, ClientError> {
        self.state.trigger()?;
        renderer.on_phase(self.state.phase());
        renderer.on_progress(self.state.progress());

        let outcome = match self.consume(renderer).await {
            Ok(()) => {
                self.state.stream_ended()?;
                info!(chars = self.state.accumulated_output().chars().count(), "Generation completed");
                Outcome::Completed
            }
            Err(e) => {
                error!("Generation failed: {}", e);
                self.state.transport_failed()?;
                Outcome::Failed(e)
            }
        };
        renderer.on_phase(self.state.phase());
        renderer.on_progress(self.state.progress());

        tokio::time::sleep(self.config.reset_delay).await;
        if self.state.reset() {
            renderer.on_phase(self.state.phase());
            renderer.on_progress(self.state.progress());
        }

        Ok(outcome)
    }

    async fn consume(&mut self, renderer: &mut dyn Renderer) -> Result<(), ClientError> {
        let body = GenerateBody {
            source_text: &self.state.source_text,
            tone: self.state.tone,
        };
        let response = self
            .http
            .post(self.config.generate_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&raw)
                .map(|body| body.error)
                .unwrap_or(raw);
            return Err(ClientError::Rejected { status: status.as_u16(), message });
        }

        self.state.response_opened()?;
        renderer.on_progress(self.state.progress());

        let mut reader = ChunkReader::new(response);
        let mut decoder = Utf8Decoder::new();
        while let Some(bytes) = reader.next_chunk().await? {
            if bytes.is_empty() {
                continue;
            }
            debug!(bytes = bytes.len(), "Chunk received");
            let text = decoder.decode(&bytes);
            let before = self.state.phase();
            self.state.chunk_received(&text)?;
            if self.state.phase() != before {
                renderer.on_phase(self.state.phase());
            }
            if !text.is_empty() {
                renderer.on_chunk(&text);
            }
            renderer.on_progress(self.state.progress());
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            self.state.tail_decoded(&tail)?;
            renderer.on_chunk(&tail);
        }

        Ok(())
    }

    /// Copy the exact current output and start the confirmation window.
    pub fn copy_output(&mut self, clipboard: &mut dyn Clipboard) -> Result<CopyConfirmation, ClipboardError> {
        clipboard.write_text(self.state.accumulated_output())?;
        let confirmation = CopyConfirmation::starting_at(Instant::now(), self.config.copy_confirmation);
        self.copied = Some(confirmation);
        Ok(confirmation)
    }

    pub fn copy_confirmed(&self, now: Instant) -> bool {
        self.copied.is_some_and(|c| c.is_visible(now))
    }
}
