//! Error types for Gemini API calls

/// Errors from suggestion generation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API returned status {status}")]
    Api { status: u16, body: String },

    #[error("failed to decode Gemini response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Gemini response contained no candidates")]
    EmptyResponse,

    #[error("unusable model output: {0}")]
    Malformed(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
