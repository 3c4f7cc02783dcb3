//! Prometheus metrics exposition
//!
//! Exposed metrics:
//!
//! - `suggestion_requests_total` (counter): label `source` (`ai`/`fallback`)
//! - `suggestion_request_duration_seconds` (histogram): label `source`
//! - `tts_requests_total` (counter): label `outcome` (`synthesized`/`fallback`)
//! - `gemini_pool_cooldowns_total` (counter, emitted by the key pool): label `reason`

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Runtime counters surfaced by the health endpoint.
#[derive(Debug, Clone)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Configures `suggestion_request_duration_seconds` with explicit buckets so
/// it renders as a histogram (with `_bucket` lines for `histogram_quantile()`
/// queries) rather than the default summary. The range covers a fast fallback
/// answer up to a slow multi-retry AI generation.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "suggestion_request_duration_seconds".to_string(),
            ),
            &[
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
            ],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed suggestion request with its data source.
pub fn record_suggestion(source: &str, duration_secs: f64) {
    metrics::counter!("suggestion_requests_total", "source" => source.to_string()).increment(1);
    metrics::histogram!("suggestion_request_duration_seconds", "source" => source.to_string())
        .record(duration_secs);
}

/// Record a TTS request outcome.
pub fn record_tts(outcome: &str) {
    metrics::counter!("tts_requests_total", "outcome" => outcome.to_string()).increment(1);
}
