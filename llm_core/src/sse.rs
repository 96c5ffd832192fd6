//! Server-sent event decoding for streaming completions.
//!
//! Upstream responses arrive as arbitrary byte chunks. Lines are buffered
//! across chunk boundaries, grouped into events on blank lines, and each
//! event is mapped to a text delta according to the provider's wire format.

use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::{LlmError, LlmProvider, TextStream};

/// One dispatched SSE event (`event:` name plus joined `data:` lines).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE parser. Feed it raw bytes, collect complete events.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no newline
    scanned: usize,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let pos = self.scanned + offset;
            self.scanned = 0;
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        self.scanned = self.buffer.len();
        events
    }

    /// Flush whatever is left once the byte stream has ended.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            self.scanned = 0;
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches('\r').to_string();
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment line, used by some providers as keep-alive
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        Some(SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// What a single event contributes to the text stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    Text(String),
    Stop,
    Skip,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicEvent {
    ContentBlockDelta { delta: AnthropicDelta },
    MessageStop,
    Error { error: ErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct OpenAiChunk {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    delta: OpenAiDelta,
}

#[derive(Deserialize, Default)]
struct OpenAiDelta {
    content: Option<String>,
}

/// Map one SSE event to a delta for the given provider.
pub fn parse_event(provider: LlmProvider, event: &SseEvent) -> Result<Delta, LlmError> {
    match provider {
        LlmProvider::Anthropic => {
            let parsed: AnthropicEvent = serde_json::from_str(&event.data)
                .map_err(|e| LlmError::Decode(format!("{e}: {}", event.data)))?;
            match parsed {
                AnthropicEvent::ContentBlockDelta {
                    delta: AnthropicDelta::TextDelta { text },
                } => Ok(Delta::Text(text)),
                AnthropicEvent::MessageStop => Ok(Delta::Stop),
                AnthropicEvent::Error { error } => Err(LlmError::Upstream(error.message)),
                _ => Ok(Delta::Skip),
            }
        }
        LlmProvider::OpenAI => {
            if event.data.trim() == "[DONE]" {
                return Ok(Delta::Stop);
            }
            let parsed: OpenAiChunk = serde_json::from_str(&event.data)
                .map_err(|e| LlmError::Decode(format!("{e}: {}", event.data)))?;
            if let Some(error) = parsed.error {
                return Err(LlmError::Upstream(error.message));
            }
            Ok(parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .map(Delta::Text)
                .unwrap_or(Delta::Skip))
        }
    }
}

/// Turn a raw SSE byte stream into an ordered stream of text deltas.
///
/// The stream ends cleanly only on the provider's terminal event. If the
/// bytes run out first, the last item is an `LlmError::Upstream`.
pub fn decode_text_stream<S, B, E>(provider: LlmProvider, bytes: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    Box::pin(text_deltas(provider, bytes))
}

fn text_deltas<S, B, E>(
    provider: LlmProvider,
    bytes: S,
) -> impl Stream<Item = Result<String, LlmError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = SseDecoder::new();
        let mut stopped = false;

        while !stopped {
            let chunk = match bytes.next().await {
                Some(chunk) => chunk.map_err(Into::<LlmError>::into)?,
                None => break,
            };
            for event in decoder.push(chunk.as_ref()) {
                match parse_event(provider, &event)? {
                    Delta::Text(text) if !text.is_empty() => {
                        yield text;
                    }
                    Delta::Stop => {
                        stopped = true;
                        break;
                    }
                    _ => {}
                }
            }
        }

        if !stopped {
            if let Some(event) = decoder.finish() {
                match parse_event(provider, &event)? {
                    Delta::Text(text) if !text.is_empty() => {
                        yield text;
                    }
                    Delta::Stop => stopped = true,
                    _ => {}
                }
            }
        }

        if !stopped {
            Err::<(), _>(LlmError::Upstream(
                "stream closed before completion signal".to_string(),
            ))?;
        }
    }
}
