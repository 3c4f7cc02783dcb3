//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! API credentials are never stored in the TOML: the Gemini keys come from
//! `GEMINI_API_KEY` plus the numbered `GEMINI_API_KEY_1..N` sequence, and the
//! TTS key from `TTS_API_KEY`. Pool tuning (rotation, threshold, cooldown) is
//! also env-only so it can differ per deployment without editing the file.

use std::path::{Path, PathBuf};

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Gemini endpoint tuning (non-secret)
#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    1000
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_retry_attempts() -> u32 {
    3
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        if !config.gemini.base_url.starts_with("http://")
            && !config.gemini.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "gemini.base_url must start with http:// or https://, got: {}",
                config.gemini.base_url
            )));
        }

        if config.server.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("kibarashi.toml")
    }
}

/// Key pool settings gathered from the environment.
#[derive(Debug)]
pub struct KeySettings {
    pub credentials: Vec<Secret<String>>,
    pub rotation_enabled: bool,
    pub failure_threshold: u32,
    pub cooldown_minutes: u64,
}

/// Gather Gemini credentials and pool tuning from the environment.
///
/// `GEMINI_API_KEY` is read first, then `GEMINI_API_KEY_1`, `GEMINI_API_KEY_2`,
/// ... until the first missing or empty variable. Duplicate values are handled
/// downstream by the pool. An empty credential list is not an error here —
/// the pool rejects it at construction, which is where the failure belongs.
pub fn key_settings_from_env() -> common::Result<KeySettings> {
    let mut credentials = Vec::new();

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        let key = key.trim();
        if !key.is_empty() {
            credentials.push(Secret::new(key.to_owned()));
        }
    }

    let mut index = 1u32;
    loop {
        match std::env::var(format!("GEMINI_API_KEY_{index}")) {
            Ok(key) if !key.trim().is_empty() => {
                credentials.push(Secret::new(key.trim().to_owned()));
                index += 1;
            }
            // Numbered sequence stops at the first gap
            _ => break,
        }
    }

    let rotation_enabled = std::env::var("GEMINI_KEY_ROTATION_ENABLED")
        .map(|v| v == "true")
        .unwrap_or(false);

    Ok(KeySettings {
        credentials,
        rotation_enabled,
        failure_threshold: env_number("GEMINI_FAILURE_THRESHOLD", 3)?,
        cooldown_minutes: env_number("GEMINI_COOLDOWN_MINUTES", 60)?,
    })
}

/// TTS credential, if configured.
pub fn tts_key_from_env() -> Option<Secret<String>> {
    std::env::var("TTS_API_KEY")
        .ok()
        .map(|k| k.trim().to_owned())
        .filter(|k| !k.is_empty())
        .map(Secret::new)
}

/// Parse a numeric env var, falling back to a default when unset. An
/// unparseable value is a configuration error, not a silent default.
fn env_number<T: std::str::FromStr>(name: &str, default: T) -> common::Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| common::Error::Config(format!("{name} is not a valid number: {raw}"))),
        Err(_) => Ok(default),
    }
}
