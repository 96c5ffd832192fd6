pub mod config;
pub mod error;
pub mod generate;
pub mod prompt;
pub mod relay;
pub mod tone;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method, Uri},
    middleware::Next,
    response::Response,
    routing::post,
    Router,
};
use llm_core::TextGenerator;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::generate::generate_endpoint;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared, read-only handler state. Nothing here is mutated per request.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn TextGenerator>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(generator: Arc<dyn TextGenerator>, config: ServerConfig) -> Self {
        Self { generator, config }
    }
}

/// Build the full application router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(config))
        .into_inner();

    let api = Router::new().route("/generate", post(generate_endpoint));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state)
}

// CORS configuration - environment-aware
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    let Some(allowed_origins) = config.cors_allowed_origins.as_ref() else {
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        return base.allow_origin(Any);
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
        base.allow_origin(Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        base.allow_origin(AllowOrigin::list(origins))
    }
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    // A v4 uuid is always a valid header value
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
        response
    } else {
        next.run(request).await
    }
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
