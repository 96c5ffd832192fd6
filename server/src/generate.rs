use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::error::ApiError;
use crate::prompt::build_prompt;
use crate::relay::relay;
use crate::tone::Tone;
use crate::validation::validate_source_text;
use crate::{AppState, REQUEST_ID_HEADER};

/// Wire form of a generate request.
///
/// Both fields accept any JSON value; anything that is not a string is
/// treated as absent so that validation and tone fallback decide.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default, deserialize_with = "string_or_none")]
    pub source_text: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub tone: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn body_rejection(rejection: BytesRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Request body is too large.".to_string())
    } else {
        ApiError::InvalidInput(rejection.body_text())
    }
}

pub async fn generate_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(body_rejection)?;
    let req: GenerateRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidInput(format!("Invalid JSON body: {e}")))?;

    let source_text = validate_source_text(req.source_text.as_deref())?;
    let tone = Tone::resolve(req.tone.as_deref());

    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    info!(
        request_id = %request_id,
        tone = tone.as_str(),
        requested_tone = ?req.tone,
        source_chars = source_text.chars().count(),
        "generate request accepted"
    );

    let prompt = build_prompt(tone, &state.config.post_language, source_text);
    let stream = relay(
        state.generator.clone(),
        prompt,
        state.config.stream_timeout(),
        request_id,
    );

    Response::builder()
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )
        .header(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"))
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::InternalError(format!("Failed to build response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_camel_case() {
        let req: GenerateRequest =
            serde_json::from_str(r#"{"sourceText":"hello there world","tone":"bold"}"#).unwrap();
        assert_eq!(req.source_text.as_deref(), Some("hello there world"));
        assert_eq!(req.tone.as_deref(), Some("bold"));
    }

    #[test]
    fn test_request_non_string_fields_become_none() {
        let req: GenerateRequest =
            serde_json::from_str(r#"{"sourceText":42,"tone":null}"#).unwrap();
        assert_eq!(req.source_text, None);
        assert_eq!(req.tone, None);

        let req: GenerateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.source_text, None);
        assert_eq!(req.tone, None);
    }
}
