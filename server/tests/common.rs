//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::Request,
    Router,
};
use futures::{stream, StreamExt};
use llm_core::{LlmError, Prompt, TextGenerator, TextStream};
use server::{build_router, config::ServerConfig, AppState};

/// One scripted upstream event
#[derive(Clone, Debug)]
pub enum Step {
    Text(String),
    Fail(String),
    /// Never yields again
    Stall,
}

/// Upstream stand-in that replays a fixed script and records every prompt.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    steps: Vec<Step>,
    open_error: Option<String>,
    prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl ScriptedGenerator {
    pub fn texts(parts: &[&str]) -> Self {
        Self {
            steps: parts.iter().map(|p| Step::Text(p.to_string())).collect(),
            ..Self::default()
        }
    }

    pub fn steps(steps: Vec<Step>) -> Self {
        Self { steps, ..Self::default() }
    }

    pub fn failing_open(message: &str) -> Self {
        Self {
            open_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn stream_text(&self, prompt: &Prompt) -> Result<TextStream, LlmError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if let Some(message) = &self.open_error {
            return Err(LlmError::Status { status: 529, body: message.clone() });
        }

        let steps = self.steps.clone();
        let stream = stream::iter(steps).then(|step| async move {
            match step {
                Step::Text(text) => Some(Ok(text)),
                Step::Fail(msg) => Some(Err(LlmError::Upstream(msg))),
                Step::Stall => {
                    futures::future::pending::<()>().await;
                    None
                }
            }
        });
        Ok(Box::pin(stream.filter_map(|item| async move { item })))
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        stream_timeout_secs: 5,
        ..ServerConfig::default()
    }
}

/// Create a test app instance backed by the real router
pub fn create_test_app(generator: ScriptedGenerator) -> Router {
    create_test_app_with_config(generator, test_config())
}

pub fn create_test_app_with_config(generator: ScriptedGenerator, config: ServerConfig) -> Router {
    build_router(AppState::new(Arc::new(generator), config))
}

pub fn generate_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Read a streamed body item by item, keeping the error if the body aborts.
pub async fn read_stream(body: Body) -> (Vec<Bytes>, Option<String>) {
    let mut frames = Vec::new();
    let mut data = body.into_data_stream();
    while let Some(item) = data.next().await {
        match item {
            Ok(bytes) => frames.push(bytes),
            Err(e) => return (frames, Some(e.to_string())),
        }
    }
    (frames, None)
}

pub const VALID_SOURCE: &str = "Launching our new product line next week, excited!";

/// Deadline already expired once anything has to wait
pub fn short_deadline_config() -> ServerConfig {
    ServerConfig {
        stream_timeout_secs: 0,
        ..ServerConfig::default()
    }
}
