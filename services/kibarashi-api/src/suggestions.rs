//! Suggestion endpoint
//!
//! Tries the Gemini client first and falls back to the static table on any
//! failure; the endpoint itself only errors on invalid input. The response
//! metadata names which source answered so clients can badge AI-generated
//! content.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use suggestion::{AgeGroup, BreakDuration, Situation, SuggestionRequest};

use crate::AppState;
use crate::metrics;

/// User-facing validation message (Japanese, like the rest of the API).
const INVALID_INPUT_MESSAGE: &str = "入力データが無効です。パラメータを確認してください。";

/// GET /api/v1/suggestions
pub async fn handle(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let request = match parse_request(&params) {
        Ok(r) => r,
        Err(detail) => {
            state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            warn!(%detail, "rejected suggestion query");
            return error_response(StatusCode::BAD_REQUEST, INVALID_INPUT_MESSAGE, "INVALID_INPUT");
        }
    };

    let started = Instant::now();
    let (suggestions, source) = match state.gemini.generate(&request).await {
        Ok(s) => (s, "ai"),
        Err(e) => {
            warn!(error = %e, "AI generation failed, serving fallback suggestions");
            (suggestion::fallback_suggestions(&request), "fallback")
        }
    };
    metrics::record_suggestion(source, started.elapsed().as_secs_f64());

    let mut metadata = serde_json::Map::new();
    metadata.insert(
        "situation".to_string(),
        serde_json::json!(request.situation.as_str()),
    );
    metadata.insert(
        "duration".to_string(),
        serde_json::json!(request.duration.minutes()),
    );
    metadata.insert("location".to_string(), serde_json::json!(request.location));
    if let Some(age_group) = request.age_group {
        metadata.insert("ageGroup".to_string(), serde_json::json!(age_group.as_str()));
    }
    metadata.insert("source".to_string(), serde_json::json!(source));
    metadata.insert(
        "timestamp".to_string(),
        serde_json::json!(chrono::Utc::now().to_rfc3339()),
    );

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CACHE_CONTROL,
                "no-cache, no-store, must-revalidate",
            ),
        ],
        serde_json::json!({
            "status": "success",
            "data": {
                "suggestions": suggestions,
                "metadata": metadata,
            }
        })
        .to_string(),
    )
        .into_response()
}

/// Validate the raw query into a typed request.
///
/// `situation` and `duration` are required and strict; an unrecognized
/// `ageGroup` is dropped rather than rejected so that older clients sending
/// new audience values keep working; `location` defaults to Tokyo.
fn parse_request(params: &HashMap<String, String>) -> Result<SuggestionRequest, String> {
    let situation: Situation = params
        .get("situation")
        .ok_or_else(|| "situation parameter missing".to_string())?
        .parse()
        .map_err(|_| format!("unknown situation: {:?}", params.get("situation")))?;

    let minutes: u32 = params
        .get("duration")
        .ok_or_else(|| "duration parameter missing".to_string())?
        .parse()
        .map_err(|_| format!("duration is not a number: {:?}", params.get("duration")))?;
    let duration = BreakDuration::from_minutes(minutes)
        .ok_or_else(|| format!("unsupported duration: {minutes}"))?;

    let age_group: Option<AgeGroup> = params
        .get("ageGroup")
        .and_then(|raw| raw.parse().ok());

    let location = params
        .get("location")
        .filter(|l| !l.is_empty())
        .cloned()
        .unwrap_or_else(|| "Tokyo".to_string());

    Ok(SuggestionRequest {
        situation,
        duration,
        age_group,
        location,
    })
}

/// API error envelope shared by the public endpoints.
pub fn error_response(status: StatusCode, message: &str, code: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::json!({
            "status": "error",
            "message": message,
            "code": code,
        })
        .to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_minimal_query() {
        let request =
            parse_request(&params(&[("situation", "workplace"), ("duration", "5")])).unwrap();
        assert_eq!(request.situation, Situation::Workplace);
        assert_eq!(request.duration, BreakDuration::Short);
        assert_eq!(request.age_group, None);
        assert_eq!(request.location, "Tokyo");
    }

    #[test]
    fn parses_full_query() {
        let request = parse_request(&params(&[
            ("situation", "studying"),
            ("duration", "15"),
            ("ageGroup", "student"),
            ("location", "Osaka"),
        ]))
        .unwrap();
        assert_eq!(request.situation, Situation::Studying);
        assert_eq!(request.duration, BreakDuration::Medium);
        assert_eq!(request.age_group, Some(AgeGroup::Student));
        assert_eq!(request.location, "Osaka");
    }

    #[test]
    fn missing_situation_is_rejected() {
        assert!(parse_request(&params(&[("duration", "5")])).is_err());
    }

    #[test]
    fn unknown_situation_is_rejected() {
        assert!(
            parse_request(&params(&[("situation", "office"), ("duration", "5")])).is_err()
        );
    }

    #[test]
    fn unsupported_duration_is_rejected() {
        assert!(
            parse_request(&params(&[("situation", "home"), ("duration", "10")])).is_err()
        );
        assert!(
            parse_request(&params(&[("situation", "home"), ("duration", "abc")])).is_err()
        );
    }

    #[test]
    fn unknown_age_group_is_dropped_not_rejected() {
        let request = parse_request(&params(&[
            ("situation", "home"),
            ("duration", "5"),
            ("ageGroup", "toddler"),
        ]))
        .unwrap();
        assert_eq!(request.age_group, None);
    }

    #[test]
    fn empty_location_falls_back_to_tokyo() {
        let request = parse_request(&params(&[
            ("situation", "home"),
            ("duration", "5"),
            ("location", ""),
        ]))
        .unwrap();
        assert_eq!(request.location, "Tokyo");
    }
}
