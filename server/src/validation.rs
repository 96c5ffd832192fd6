use crate::error::ApiError;

/// Minimum source length, counted in characters after trimming
pub const MIN_SOURCE_CHARS: usize = 10;

pub const SOURCE_TOO_SHORT: &str = "Source text is too short.";

/// Validate the source text of a generate request.
///
/// Absent text counts as too short. Nothing else is checked.
pub fn validate_source_text(text: Option<&str>) -> Result<&str, ApiError> {
    match text {
        Some(text) if text.trim().chars().count() >= MIN_SOURCE_CHARS => Ok(text),
        _ => Err(ApiError::InvalidInput(SOURCE_TOO_SHORT.to_string())),
    }
}
