//! Credential masking for status listings
//!
//! API keys appear in the admin key listing and in warning logs; only a short
//! prefix may ever leave the process.

/// Mask a credential down to its first eight characters.
///
/// Values too short to have a meaningful prefix are fully redacted.
pub fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(8).collect();
    if value.chars().count() <= 8 {
        return "***".to_string();
    }
    format!("{prefix}...")
}
