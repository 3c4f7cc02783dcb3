//! Gemini `generateContent` client with key-pool integration

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use gemini_pool::KeyPool;
use suggestion::{Suggestion, SuggestionRequest};

use crate::classify;
use crate::error::{Error, Result};
use crate::parse;
use crate::prompt;

/// Client settings. Secrets are not part of this struct — keys come from the
/// pool at request time.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub model: String,
    pub retry_attempts: u32,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            retry_attempts: 3,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Suggestion generator backed by the Gemini API.
///
/// Each attempt acquires a key from the pool and reports the outcome back,
/// so rate-limited keys cool down and the next attempt rotates onto a
/// different one.
pub struct GeminiClient {
    http: reqwest::Client,
    pool: Arc<KeyPool>,
    config: ClientConfig,
}

impl GeminiClient {
    pub fn new(pool: Arc<KeyPool>, config: ClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, pool, config }
    }

    /// Generate three suggestions for the request.
    ///
    /// Retries with a linear backoff; the last error is returned when every
    /// attempt fails. Callers are expected to fall back to the static table.
    pub async fn generate(&self, request: &SuggestionRequest) -> Result<Vec<Suggestion>> {
        let prompt = prompt::build(request);
        let attempts = self.config.retry_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(Duration::from_secs(u64::from(attempt - 1))).await;
            }

            let key = self.pool.acquire();
            debug!(attempt, key_index = key.index, "requesting suggestions");

            match self.call_api(&key.credential, &prompt).await {
                Ok(text) => match parse::parse_suggestions(&text, request.duration) {
                    Ok(suggestions) => {
                        self.pool.report_success(&key.credential);
                        return Ok(suggestions);
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "model output unusable");
                        self.pool.report_failure(&key.credential, false);
                        last_error = Some(e);
                    }
                },
                Err(e) => {
                    let rate_limited = match &e {
                        Error::Api { status, body } => classify::is_rate_limit(*status, body),
                        _ => false,
                    };
                    warn!(attempt, rate_limited, error = %e, "gemini request failed");
                    self.pool.report_failure(&key.credential, rate_limited);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(Error::EmptyResponse))
    }

    /// One `generateContent` call. Returns the raw model text.
    async fn call_api(&self, credential: &str, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            credential,
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.9,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": 2048,
            }
        });

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        if !(200..300).contains(&status) {
            return Err(Error::Api { status, body: text });
        }

        let decoded: GenerateContentResponse = serde_json::from_str(&text)?;
        decoded
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(Error::EmptyResponse)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use gemini_pool::PoolConfig;
    use suggestion::{BreakDuration, Situation};
    use tokio::net::TcpListener;

    fn test_pool(keys: &[&str]) -> Arc<KeyPool> {
        Arc::new(
            KeyPool::new(
                keys.iter().map(|s| s.to_string()).collect(),
                PoolConfig {
                    rotation_enabled: true,
                    failure_threshold: 3,
                    cooldown: Duration::from_secs(3600),
                },
            )
            .unwrap(),
        )
    }

    fn test_config(base_url: &str) -> ClientConfig {
        ClientConfig {
            base_url: base_url.to_string(),
            model: "gemini-1.5-flash".to_string(),
            retry_attempts: 1,
            timeout: Duration::from_secs(2),
        }
    }

    fn test_request() -> SuggestionRequest {
        SuggestionRequest {
            situation: Situation::Workplace,
            duration: BreakDuration::Short,
            age_group: None,
            location: "Tokyo".to_string(),
        }
    }

    /// Gemini-shaped success payload wrapping the given model text.
    fn candidate_body(text: &str) -> String {
        serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }] }
            }]
        })
        .to_string()
    }

    /// Start a mock Gemini endpoint returning a fixed status and body.
    async fn start_mock(status: StatusCode, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let app = axum::Router::new().fallback(move || {
                let body = body.clone();
                async move {
                    (
                        status,
                        [(axum::http::header::CONTENT_TYPE, "application/json")],
                        body,
                    )
                }
            });
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn successful_generation_reports_success_to_pool() {
        let model_text = r#"[
            {"title": "深呼吸", "description": "d", "category": "認知的", "steps": ["s1"]},
            {"title": "散歩", "description": "d", "category": "行動的", "steps": ["s1"]},
            {"title": "瞑想", "description": "d", "category": "認知的", "steps": ["s1"]}
        ]"#;
        let url = start_mock(StatusCode::OK, candidate_body(model_text)).await;

        let pool = test_pool(&["key-a"]);
        let client = GeminiClient::new(pool.clone(), test_config(&url));

        let suggestions = client.generate(&test_request()).await.unwrap();
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].title, "深呼吸");

        let stats = pool.stats();
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.rate_limit_hits, 0);
    }

    #[tokio::test]
    async fn fenced_model_output_is_parsed() {
        let model_text = "```json\n[{\"title\": \"休憩\", \"category\": \"行動的\"}]\n```";
        let url = start_mock(StatusCode::OK, candidate_body(model_text)).await;

        let client = GeminiClient::new(test_pool(&["key-a"]), test_config(&url));
        let suggestions = client.generate(&test_request()).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].title, "休憩");
    }

    #[tokio::test]
    async fn rate_limited_key_enters_cooldown() {
        let url = start_mock(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#.to_string(),
        )
        .await;

        let pool = test_pool(&["key-a", "key-b"]);
        let client = GeminiClient::new(pool.clone(), test_config(&url));

        let err = client.generate(&test_request()).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 429, .. }));

        let stats = pool.stats();
        assert_eq!(stats.rate_limit_hits, 1);
        assert_eq!(stats.available_keys, 1);
    }

    #[tokio::test]
    async fn retries_acquire_a_fresh_key_after_rate_limit() {
        let url = start_mock(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#.to_string(),
        )
        .await;

        let pool = test_pool(&["key-a", "key-b"]);
        let mut config = test_config(&url);
        config.retry_attempts = 2;
        let client = GeminiClient::new(pool.clone(), config);

        let _ = client.generate(&test_request()).await.unwrap_err();

        // Both keys were tried and both are now cooling down
        let stats = pool.stats();
        assert_eq!(stats.rate_limit_hits, 2);
        assert_eq!(stats.available_keys, 0);
    }

    #[tokio::test]
    async fn unusable_model_output_counts_as_plain_failure() {
        let url = start_mock(
            StatusCode::OK,
            candidate_body("提案できませんでした。"),
        )
        .await;

        let pool = test_pool(&["key-a"]);
        let client = GeminiClient::new(pool.clone(), test_config(&url));

        let err = client.generate(&test_request()).await.unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));

        let stats = pool.stats();
        assert_eq!(stats.rate_limit_hits, 0);
        assert_eq!(stats.keys[0].failure_count, 1);
        assert!(!stats.keys[0].on_cooldown);
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let url = start_mock(StatusCode::OK, r#"{"candidates": []}"#.to_string()).await;

        let client = GeminiClient::new(test_pool(&["key-a"]), test_config(&url));
        let err = client.generate(&test_request()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let client = GeminiClient::new(
            test_pool(&["key-a"]),
            test_config("http://127.0.0.1:1"),
        );
        let err = client.generate(&test_request()).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
