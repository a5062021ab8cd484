use crate::error::ApiError;

/// Maximum text length for synthesis requests
const MAX_TEXT_LENGTH: usize = 5000;

/// Validate a voice synthesis request before it reaches the pipeline
pub fn validate_voice_request(text: &str, language: &str, style: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_TEXT_LENGTH
        )));
    }

    if style.trim().is_empty() {
        return Err(ApiError::InvalidInput("Style cannot be empty".to_string()));
    }

    if !is_supported_language(language) {
        return Err(ApiError::InvalidInput(format!(
            "Unsupported language: {}. Expected one of JP, EN, ZH",
            language
        )));
    }

    Ok(())
}

fn is_supported_language(code: &str) -> bool {
    matches!(code, "JP" | "EN" | "ZH")
}
