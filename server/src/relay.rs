//! Relay of upstream text deltas into an HTTP response body.
//!
//! The body stream owns the upstream stream. Hyper only polls it when the
//! connection can take more bytes, so a slow reader slows the upstream read
//! instead of growing a buffer. When the caller goes away the body is
//! dropped, which drops the upstream response with it.

use std::{sync::Arc, time::Duration};

use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use llm_core::{Prompt, TextGenerator};
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use crate::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Streaming,
    Completed,
    Failed,
}

/// Tracks one relay and logs how it ended when dropped.
struct RelayGuard {
    request_id: String,
    started: Instant,
    chunks: usize,
    bytes: usize,
    outcome: Outcome,
}

impl RelayGuard {
    fn new(request_id: String) -> Self {
        Self {
            request_id,
            started: Instant::now(),
            chunks: 0,
            bytes: 0,
            outcome: Outcome::Streaming,
        }
    }

    fn record(&mut self, len: usize) {
        self.chunks += 1;
        self.bytes += len;
    }

    fn fail(&mut self, error: &RelayError) {
        self.outcome = Outcome::Failed;
        warn!(
            request_id = %self.request_id,
            chunks = self.chunks,
            bytes = self.bytes,
            "relay aborted: {error}"
        );
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        match self.outcome {
            Outcome::Completed => info!(
                request_id = %self.request_id,
                chunks = self.chunks,
                bytes = self.bytes,
                elapsed_ms,
                "relay completed"
            ),
            // Already logged in fail()
            Outcome::Failed => {}
            Outcome::Streaming => info!(
                request_id = %self.request_id,
                chunks = self.chunks,
                bytes = self.bytes,
                elapsed_ms,
                "caller disconnected, upstream stream released"
            ),
        }
    }
}

/// How long a failing relay waits before aborting the body, so the
/// connection can write out frames it has already accepted.
pub const ABORT_FLUSH_GRACE: Duration = Duration::from_millis(50);

/// Open the upstream call and forward each text delta as it arrives.
///
/// Nothing happens until the body is first polled. The whole relay, upstream
/// open included, must finish within `limit`. Any failure ends the stream
/// with an error item after the bytes already forwarded. Before that item is
/// yielded the stream stays pending for [`ABORT_FLUSH_GRACE`]: hyper drops
/// its unflushed write buffer when a body errors, and a pending body is what
/// makes it flush.
pub fn relay(
    generator: Arc<dyn TextGenerator>,
    prompt: Prompt,
    limit: Duration,
    request_id: String,
) -> impl Stream<Item = Result<Bytes, RelayError>> + Send + 'static {
    async_stream::stream! {
        let mut guard = RelayGuard::new(request_id);
        let deadline = Instant::now() + limit;

        let failure = match timeout_at(deadline, generator.stream_text(&prompt)).await {
            Ok(Ok(mut upstream)) => loop {
                match timeout_at(deadline, upstream.next()).await {
                    Ok(Some(Ok(text))) => {
                        if text.is_empty() {
                            continue;
                        }
                        guard.record(text.len());
                        yield Ok(Bytes::from(text));
                    }
                    Ok(Some(Err(e))) => break Some(RelayError::from(e)),
                    Ok(None) => break None,
                    Err(_) => break Some(RelayError::DeadlineExceeded(limit)),
                }
            },
            Ok(Err(e)) => Some(RelayError::from(e)),
            Err(_) => Some(RelayError::DeadlineExceeded(limit)),
        };

        match failure {
            None => guard.outcome = Outcome::Completed,
            Some(err) => {
                guard.fail(&err);
                tokio::time::sleep(ABORT_FLUSH_GRACE).await;
                yield Err(err);
            }
        }
    }
}
