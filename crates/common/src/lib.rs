//! Shared types for the kibarashi services

mod error;
mod redact;
mod secret;

pub use error::{Error, Result};
pub use redact::mask;
pub use secret::Secret;
