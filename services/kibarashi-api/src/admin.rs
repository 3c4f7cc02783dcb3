//! Admin API for key pool management
//!
//! Runs on a separate listener port so the public API surface never exposes
//! pool internals. Credentials are only ever reported in masked form.
//!
//! Endpoints:
//! - GET  /admin/keys                  — pool stats with per-key state
//! - POST /admin/keys/rotate           — force rotation to the next key
//! - POST /admin/keys/reset-cooldowns  — clear every cooldown and failure count

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tracing::info;

use gemini_pool::KeyPool;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pool: Arc<KeyPool>,
}

impl AdminState {
    pub fn new(pool: Arc<KeyPool>) -> Self {
        Self { pool }
    }
}

/// Build the admin axum router.
pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/keys", get(list_keys))
        .route("/admin/keys/rotate", post(rotate_key))
        .route("/admin/keys/reset-cooldowns", post(reset_cooldowns))
        .with_state(state)
}

/// GET /admin/keys — cumulative counters plus the per-key snapshot.
async fn list_keys(State(state): State<AdminState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::json!(state.pool.stats()).to_string(),
    )
}

/// POST /admin/keys/rotate — manual remediation when a key misbehaves.
///
/// Returns 409 when every key is cooling down, since there is nothing to
/// rotate onto.
async fn rotate_key(State(state): State<AdminState>) -> impl IntoResponse {
    match state.pool.force_rotation() {
        Ok(selected) => {
            info!(index = selected.index, "manual key rotation");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                serde_json::json!({
                    "rotated": true,
                    "index": selected.index,
                    "key": common::mask(&selected.credential),
                })
                .to_string(),
            )
        }
        Err(e) => (
            StatusCode::CONFLICT,
            [(header::CONTENT_TYPE, "application/json")],
            serde_json::json!({
                "rotated": false,
                "error": e.to_string(),
            })
            .to_string(),
        ),
    }
}

/// POST /admin/keys/reset-cooldowns — administrative escape hatch.
async fn reset_cooldowns(State(state): State<AdminState>) -> impl IntoResponse {
    state.pool.reset_all_cooldowns();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::json!({
            "status": "reset",
            "keys": state.pool.stats(),
        })
        .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use gemini_pool::PoolConfig;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_pool(rotation: bool) -> Arc<KeyPool> {
        Arc::new(
            KeyPool::new(
                vec![
                    "AIzaSyFirstTestKey0001".to_string(),
                    "AIzaSySecondTestKey002".to_string(),
                ],
                PoolConfig {
                    rotation_enabled: rotation,
                    failure_threshold: 3,
                    cooldown: Duration::from_secs(3600),
                },
            )
            .unwrap(),
        )
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn list_keys_reports_masked_credentials_only() {
        let app = build_admin_router(AdminState::new(test_pool(true)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/keys")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let raw = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let text = String::from_utf8(raw.to_vec()).unwrap();
        assert!(!text.contains("TestKey0001"), "raw credential leaked: {text}");

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["total_keys"], 2);
        assert_eq!(json["available_keys"], 2);
        assert_eq!(json["keys"][0]["masked"], "AIzaSyFi...");
    }

    #[tokio::test]
    async fn rotate_returns_next_key_index() {
        let pool = test_pool(true);
        pool.acquire();

        let app = build_admin_router(AdminState::new(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/keys/rotate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["rotated"], true);
        assert_eq!(json["index"], 1);
        assert_eq!(json["key"], "AIzaSySe...");
    }

    #[tokio::test]
    async fn rotate_conflicts_when_every_key_cools() {
        let pool = test_pool(true);
        pool.report_failure("AIzaSyFirstTestKey0001", true);
        pool.report_failure("AIzaSySecondTestKey002", true);

        let app = build_admin_router(AdminState::new(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/keys/rotate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["rotated"], false);
    }

    #[tokio::test]
    async fn reset_cooldowns_restores_availability() {
        let pool = test_pool(true);
        pool.report_failure("AIzaSyFirstTestKey0001", true);
        pool.report_failure("AIzaSySecondTestKey002", true);
        assert_eq!(pool.stats().available_keys, 0);

        let app = build_admin_router(AdminState::new(pool.clone()));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/keys/reset-cooldowns")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "reset");
        assert_eq!(json["keys"]["available_keys"], 2);
        assert_eq!(pool.stats().available_keys, 2);
    }

    #[tokio::test]
    async fn admin_router_rejects_unknown_paths() {
        let app = build_admin_router(AdminState::new(test_pool(false)));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/suggestions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
