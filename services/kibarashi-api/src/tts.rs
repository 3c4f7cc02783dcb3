//! Text-to-speech endpoint
//!
//! Forwards text to the Google Cloud TTS `text:synthesize` endpoint as SSML
//! and returns the base64 audio. Any failure (no key configured, transport
//! error, upstream rejection) degrades to a 200 payload telling the client
//! to use browser speech synthesis instead.

use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::AppState;
use crate::metrics;

#[derive(Debug, thiserror::Error)]
enum SynthesisError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TTS API returned status {0}")]
    Api(u16),

    #[error("TTS response missing audioContent")]
    MissingAudio,
}

/// POST /api/v1/tts
pub async fn handle(State(state): State<AppState>, Json(body): Json<serde_json::Value>) -> Response {
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let text = body
        .get("text")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    if text.is_empty() {
        state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
        return (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "application/json")],
            serde_json::json!({ "error": "Missing required parameter: text" }).to_string(),
        )
            .into_response();
    }

    let speaking_rate = body
        .get("speakingRate")
        .and_then(|v| v.as_f64())
        .unwrap_or(1.0);
    let pitch = body.get("pitch").and_then(|v| v.as_f64()).unwrap_or(0.0);

    let Some(key) = state.tts_key.as_ref() else {
        debug!("no TTS key configured, directing client to browser synthesis");
        metrics::record_tts("fallback");
        return fallback_response(&text);
    };

    match synthesize(
        &state.http,
        &state.tts_endpoint,
        key.expose(),
        &text,
        speaking_rate,
        pitch,
    )
    .await
    {
        Ok(audio_content) => {
            metrics::record_tts("synthesized");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                serde_json::json!({
                    "audioContent": audio_content,
                    "format": "mp3",
                    "fallback": false,
                })
                .to_string(),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "speech synthesis failed, directing client to browser synthesis");
            metrics::record_tts("fallback");
            fallback_response(&text)
        }
    }
}

/// 200 payload instructing the client to fall back to the Web Speech API.
fn fallback_response(text: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::json!({
            "fallback": true,
            "useBrowserTts": true,
            "text": text,
        })
        .to_string(),
    )
        .into_response()
}

/// One `text:synthesize` call. Returns the base64 audio payload verbatim.
async fn synthesize(
    http: &reqwest::Client,
    endpoint: &str,
    key: &str,
    text: &str,
    speaking_rate: f64,
    pitch: f64,
) -> Result<String, SynthesisError> {
    let url = format!("{}/v1/text:synthesize?key={}", endpoint.trim_end_matches('/'), key);

    let body = serde_json::json!({
        "input": { "ssml": build_ssml(text) },
        "voice": { "languageCode": "ja-JP", "name": "ja-JP-Neural2-B" },
        "audioConfig": {
            "audioEncoding": "MP3",
            "speakingRate": speaking_rate,
            "pitch": pitch,
        }
    });

    let response = http.post(&url).json(&body).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SynthesisError::Api(status.as_u16()));
    }

    let decoded: serde_json::Value = response.json().await?;
    decoded
        .get("audioContent")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or(SynthesisError::MissingAudio)
}

/// Wrap guidance text in SSML with a pause after each sentence.
fn build_ssml(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    let with_pauses = escaped.replace('。', "。<break time=\"500ms\"/>");
    format!("<speak>{with_pauses}</speak>")
}
