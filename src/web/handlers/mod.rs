pub mod analyze;
pub mod auth;
pub mod neutralize;
pub mod users;

use serde::Deserialize;

use super::ApiError;

/// JSON body carrying just the text to analyze.
#[derive(Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Reject empty or whitespace-only input before it reaches a model.
pub(crate) fn require_text(text: &str) -> Result<&str, ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest("Text must not be empty".to_string()));
    }
    Ok(text)
}
