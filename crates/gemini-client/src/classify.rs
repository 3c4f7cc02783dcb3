//! Rate-limit detection for Gemini API error responses
//!
//! Distinguishes quota/rate-limit failures (which put a key on cooldown
//! immediately) from ordinary failures (which only count toward the failure
//! threshold).

/// Phrases that mark a response body as a quota or rate-limit rejection.
const RATE_LIMIT_PATTERNS: &[&str] = &[
    "resource_exhausted",
    "quota",
    "rate limit",
    "too many requests",
];

/// Classify an upstream failure as rate-limiting or not.
///
/// HTTP 429 is always a rate limit. Other statuses are checked against the
/// known quota phrases, since Gemini sometimes reports quota exhaustion
/// inside a 400/403 error payload.
pub fn is_rate_limit(status: u16, body: &str) -> bool {
    if status == 429 {
        return true;
    }
    let lower = body.to_lowercase();
    RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p))
}
