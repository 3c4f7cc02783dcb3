//! Gemini API client for suggestion generation
//!
//! Wraps the `generateContent` REST endpoint with key-pool integration:
//! every attempt acquires a key from the pool and reports the outcome back,
//! so rate-limited keys rotate out of service automatically. Model output is
//! parsed defensively — fenced, prefixed or trailing prose around the JSON
//! array is tolerated.

pub mod classify;
pub mod client;
pub mod error;
pub mod parse;
pub mod prompt;

pub use client::{ClientConfig, GeminiClient};
pub use error::{Error, Result};
