//! kibarashi-api
//!
//! Japanese micro-break suggestion service:
//! 1. Serves 3 relaxation suggestions per request, AI-generated via Gemini
//!    with a static-table fallback
//! 2. Serves seasonal/weather context for the suggestion UI
//! 3. Forwards text-to-speech requests with a browser-synthesis fallback
//! 4. Exposes key-pool administration on a separate port

mod admin;
mod config;
mod context;
mod metrics;
mod suggestions;
mod tts;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gemini_client::{ClientConfig, GeminiClient};
use gemini_pool::{KeyPool, PoolConfig};

use crate::config::Config;
use crate::metrics::ServiceMetrics;

/// Bound on how long a graceful shutdown may drain in-flight requests.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<KeyPool>,
    pub gemini: Arc<GeminiClient>,
    pub http: reqwest::Client,
    pub tts_key: Option<Arc<common::Secret<String>>>,
    pub tts_endpoint: String,
    pub metrics: ServiceMetrics,
    pub prometheus: PrometheusHandle,
}

/// Build the public axum router with all routes and shared state.
///
/// CORS is permissive — the API is consumed directly from the browser — and
/// a concurrency limit layer bounds simultaneous requests.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/api/v1/suggestions", get(suggestions::handle))
        .route("/api/v1/context", get(context::handle))
        .route("/api/v1/tts", post(tts::handle))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting kibarashi-api");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    // A pool with zero keys is useless; fail startup rather than serve a
    // service that can never reach the AI provider.
    let key_settings = config::key_settings_from_env()?;
    let pool = Arc::new(
        KeyPool::new(
            key_settings
                .credentials
                .iter()
                .map(|k| k.expose().clone())
                .collect(),
            PoolConfig {
                rotation_enabled: key_settings.rotation_enabled,
                failure_threshold: key_settings.failure_threshold,
                cooldown: Duration::from_secs(key_settings.cooldown_minutes * 60),
            },
        )
        .context("no Gemini API keys found — set GEMINI_API_KEY or GEMINI_API_KEY_1")?,
    );

    let gemini = Arc::new(GeminiClient::new(
        pool.clone(),
        ClientConfig {
            base_url: config.gemini.base_url.clone(),
            model: config.gemini.model.clone(),
            retry_attempts: config.gemini.retry_attempts,
            timeout: Duration::from_secs(config.server.timeout_secs),
        },
    ));

    let tts_key = config::tts_key_from_env().map(Arc::new);
    if tts_key.is_none() {
        warn!("TTS_API_KEY not set, /api/v1/tts will answer with browser-synthesis fallback");
    }

    let state = AppState {
        pool: pool.clone(),
        gemini,
        http: reqwest::Client::new(),
        tts_key,
        tts_endpoint: "https://texttospeech.googleapis.com".to_string(),
        metrics: ServiceMetrics::new(),
        prometheus: prometheus_handle,
    };

    info!(
        listen_addr = %config.server.listen_addr,
        admin_addr = %config.server.admin_addr,
        model = %config.gemini.model,
        "configuration loaded"
    );

    let app = build_router(state, config.server.max_connections);
    let admin_app = admin::build_admin_router(admin::AdminState::new(pool));

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;
    let admin_listener = TcpListener::bind(config.server.admin_addr)
        .await
        .with_context(|| format!("failed to bind admin listener to {}", config.server.admin_addr))?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(admin_listener, admin_app).await {
            error!(error = %e, "admin server error");
        }
    });

    info!(addr = %config.server.listen_addr, "accepting requests");

    // Graceful shutdown: stop accepting on SIGTERM/SIGINT, drain in-flight
    // requests, and enforce DRAIN_TIMEOUT so a slow client cannot block exit.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: overall status follows the key pool (healthy/degraded →
/// 200, unhealthy → 503) plus uptime and request counters.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let pool_health = state.pool.health();
    let uptime = state.metrics.started_at.elapsed().as_secs();
    let requests = state.metrics.requests_total.load(Ordering::Relaxed);
    let errors = state.metrics.errors_total.load(Ordering::Relaxed);

    let status_code = if pool_health["status"] == "unhealthy" {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    } else {
        axum::http::StatusCode::OK
    };

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        serde_json::json!({
            "status": pool_health["status"],
            "uptime_seconds": uptime,
            "requests_served": requests,
            "errors_total": errors,
            "pool": pool_health,
        })
        .to_string(),
    )
}

/// Prometheus metrics endpoint — returns metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
