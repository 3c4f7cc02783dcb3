//! Error types for pool operations

/// Errors from pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no Gemini API keys configured")]
    NoKeys,

    #[error("cannot rotate: every key is cooling down")]
    PoolExhausted,
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
