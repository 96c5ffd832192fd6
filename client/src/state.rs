//! Per-session client state and its transitions.
//!
//! All mutation goes through the named events below. Each generate cycle
//! runs `Idle -> Requesting -> Streaming -> Completed | Failed -> Idle`.

use std::fmt;

use thiserror::Error;

use crate::request::Tone;

pub const PROGRESS_ON_TRIGGER: u8 = 10;
pub const PROGRESS_ON_RESPONSE: u8 = 40;
pub const PROGRESS_STEP: u8 = 1;
/// Highest value synthetic progress reaches before the stream ends
pub const PROGRESS_CAP: u8 = 95;
pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Requesting => "requesting",
            Phase::Streaming => "streaming",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot handle `{event}` while {phase}")]
pub struct TransitionError {
    pub event: &'static str,
    pub phase: Phase,
}

#[derive(Debug, Clone)]
pub struct ClientState {
    pub source_text: String,
    pub tone: Tone,
    accumulated_output: String,
    phase: Phase,
    progress: u8,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            source_text: String::new(),
            tone: Tone::default(),
            accumulated_output: String::new(),
            phase: Phase::Idle,
            progress: 0,
        }
    }
}

impl ClientState {
    pub fn new(source_text: impl Into<String>, tone: Tone) -> Self {
        Self {
            source_text: source_text.into(),
            tone,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn accumulated_output(&self) -> &str {
        &self.accumulated_output
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Requesting | Phase::Streaming)
    }

    /// Whether the generate trigger is enabled
    pub fn can_generate(&self) -> bool {
        !self.is_loading() && !self.source_text.is_empty()
    }

    /// Start a new request. Clears the previous output.
    pub fn trigger(&mut self) -> Result<(), TransitionError> {
        if !self.can_generate() {
            return Err(self.reject("trigger"));
        }
        self.accumulated_output.clear();
        self.phase = Phase::Requesting;
        self.progress = PROGRESS_ON_TRIGGER;
        Ok(())
    }

    /// Response headers arrived with a success status.
    pub fn response_opened(&mut self) -> Result<(), TransitionError> {
        if self.phase != Phase::Requesting {
            return Err(self.reject("response_opened"));
        }
        self.progress = self.progress.max(PROGRESS_ON_RESPONSE);
        Ok(())
    }

    /// One body chunk arrived. `text` is whatever it decoded to, which is
    /// empty when the chunk only held the start of a multi-byte character.
    /// The chunk still counts for the phase and the progress step.
    pub fn chunk_received(&mut self, text: &str) -> Result<(), TransitionError> {
        if !self.is_loading() {
            return Err(self.reject("chunk_received"));
        }
        self.phase = Phase::Streaming;
        self.accumulated_output.push_str(text);
        self.progress = self.progress.saturating_add(PROGRESS_STEP).min(PROGRESS_CAP).max(self.progress);
        Ok(())
    }

    /// Text left in the decoder once the body has ended.
    pub fn tail_decoded(&mut self, text: &str) -> Result<(), TransitionError> {
        if !self.is_loading() {
            return Err(self.reject("tail_decoded"));
        }
        self.accumulated_output.push_str(text);
        Ok(())
    }

    pub fn stream_ended(&mut self) -> Result<(), TransitionError> {
        if !self.is_loading() {
            return Err(self.reject("stream_ended"));
        }
        self.phase = Phase::Completed;
        self.progress = PROGRESS_DONE;
        Ok(())
    }

    /// Terminal failure. Output received so far is kept as is.
    pub fn transport_failed(&mut self) -> Result<(), TransitionError> {
        if !self.is_loading() {
            return Err(self.reject("transport_failed"));
        }
        self.phase = Phase::Failed;
        Ok(())
    }

    /// Cosmetic reset after the delay. Returns false when there was nothing
    /// to reset, so a stale reset cannot clobber a newer request.
    pub fn reset(&mut self) -> bool {
        match self.phase {
            Phase::Completed | Phase::Failed => {
                self.phase = Phase::Idle;
                self.progress = 0;
                true
            }
            _ => false,
        }
    }

    fn reject(&self, event: &'static str) -> TransitionError {
        TransitionError { event, phase: self.phase }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> ClientState {
        ClientState::new("Launching our new product line", Tone::Bold)
    }

    #[test]
    fn test_full_cycle() {
        let mut state = ready();
        state.trigger().unwrap();
        assert_eq!(state.phase(), Phase::Requesting);
        assert_eq!(state.progress(), PROGRESS_ON_TRIGGER);
        assert!(state.is_loading());

        state.response_opened().unwrap();
        assert_eq!(state.progress(), PROGRESS_ON_RESPONSE);
        assert_eq!(state.phase(), Phase::Requesting);

        state.chunk_received("Hello").unwrap();
        assert_eq!(state.phase(), Phase::Streaming);
        state.chunk_received(", world").unwrap();
        assert_eq!(state.accumulated_output(), "Hello, world");
        assert_eq!(state.progress(), PROGRESS_ON_RESPONSE + 2);

        state.stream_ended().unwrap();
        assert_eq!(state.phase(), Phase::Completed);
        assert_eq!(state.progress(), PROGRESS_DONE);
        assert!(!state.is_loading());

        assert!(state.reset());
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.progress(), 0);
        // Output survives the cosmetic reset
        assert_eq!(state.accumulated_output(), "Hello, world");
    }

    #[test]
    fn test_progress_is_capped_and_monotonic() {
        let mut state = ready();
        state.trigger().unwrap();
        state.response_opened().unwrap();
        let mut last = state.progress();
        for _ in 0..200 {
            state.chunk_received("x").unwrap();
            assert!(state.progress() >= last);
            assert!(state.progress() <= PROGRESS_CAP);
            last = state.progress();
        }
        assert_eq!(state.progress(), PROGRESS_CAP);
        state.stream_ended().unwrap();
        assert_eq!(state.progress(), PROGRESS_DONE);
    }

    #[test]
    fn test_trigger_clears_previous_output() {
        let mut state = ready();
        state.trigger().unwrap();
        state.chunk_received("old").unwrap();
        state.stream_ended().unwrap();
        state.reset();

        state.trigger().unwrap();
        assert_eq!(state.accumulated_output(), "");
    }

    #[test]
    fn test_trigger_refused_while_loading_or_empty() {
        let mut state = ready();
        state.trigger().unwrap();
        let err = state.trigger().unwrap_err();
        assert_eq!(err, TransitionError { event: "trigger", phase: Phase::Requesting });

        let mut empty = ClientState::default();
        assert!(!empty.can_generate());
        assert!(empty.trigger().is_err());
    }

    #[test]
    fn test_failure_keeps_partial_output() {
        let mut state = ready();
        state.trigger().unwrap();
        state.response_opened().unwrap();
        state.chunk_received("partial").unwrap();
        let before = state.progress();
        state.transport_failed().unwrap();
        assert_eq!(state.phase(), Phase::Failed);
        assert_eq!(state.accumulated_output(), "partial");
        assert_eq!(state.progress(), before);
        assert!(state.reset());
        assert_eq!(state.progress(), 0);
    }

    #[test]
    fn test_empty_body_completes_from_requesting() {
        let mut state = ready();
        state.trigger().unwrap();
        state.response_opened().unwrap();
        state.stream_ended().unwrap();
        assert_eq!(state.phase(), Phase::Completed);
        assert_eq!(state.accumulated_output(), "");
    }

    #[test]
    fn test_chunk_without_complete_character_still_counts() {
        let mut state = ready();
        state.trigger().unwrap();
        state.response_opened().unwrap();
        state.chunk_received("").unwrap();
        assert_eq!(state.phase(), Phase::Streaming);
        assert_eq!(state.progress(), PROGRESS_ON_RESPONSE + PROGRESS_STEP);

        state.chunk_received("€").unwrap();
        state.tail_decoded("\u{FFFD}").unwrap();
        assert_eq!(state.accumulated_output(), "€\u{FFFD}");
        assert_eq!(state.progress(), PROGRESS_ON_RESPONSE + 2 * PROGRESS_STEP);
    }

    #[test]
    fn test_events_rejected_when_idle() {
        let mut state = ready();
        assert!(state.chunk_received("x").is_err());
        assert!(state.tail_decoded("x").is_err());
        assert!(state.stream_ended().is_err());
        assert!(state.transport_failed().is_err());
        assert!(state.response_opened().is_err());
        assert!(!state.reset());
        assert_eq!(state.accumulated_output(), "");
    }
}
