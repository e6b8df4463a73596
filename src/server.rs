//! HTTP surface for the browser frontend.
//!
//! Three routes, all read-only:
//! - `GET /api/snapshot/latest`: the latest snapshot, delta-annotated when
//!   a previous edition exists; 404 before the first edition, 500 when the
//!   snapshot file is unreadable
//! - `GET /api/thumbnails?universeIds=<csv>`: proxied game icons, served
//!   through the TTL + capacity-bounded cache; 400 without ids, 502 when
//!   the upstream call fails
//! - `GET /healthz`: process status and last refresh outcome
//!
//! Handlers stay thin; everything they do is delegated to `state`,
//! `outputs::json`, and `delta`, which carry the tests.

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use crate::roblox::thumbnails;
use crate::state::SharedState;
use crate::utils::date_key_utc9;
use crate::{delta, outputs};

/// Build the application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/snapshot/latest", get(latest_snapshot))
        .route("/api/thumbnails", get(thumbnails_proxy))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn latest_snapshot(State(state): State<SharedState>) -> Response {
    let snapshot = match state.latest().await {
        Some(snapshot) => snapshot,
        // cold start: fall back to whatever a previous process left on disk
        None => match outputs::json::read_latest(&state.snapshots_dir).await {
            Ok(Some(snapshot)) => state.install_latest(snapshot).await,
            Ok(None) => {
                return error_response(StatusCode::NOT_FOUND, "no snapshot available yet");
            }
            Err(e) => {
                error!(error = %e, "Failed to read latest snapshot from disk");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to load snapshot",
                );
            }
        },
    };

    let previous = match date_key_utc9(&snapshot.generatedAt) {
        Ok(date_key) => outputs::json::read_previous(&state.snapshots_dir, &date_key)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read previous edition; serving without deltas");
                None
            }),
        Err(e) => {
            warn!(error = %e, "Latest snapshot has an unparseable timestamp; serving without deltas");
            None
        }
    };

    let annotated = delta::annotate(&snapshot, previous.as_ref());
    (StatusCode::OK, axum::Json(annotated)).into_response()
}

#[derive(Debug, Deserialize)]
struct ThumbnailsQuery {
    #[serde(rename = "universeIds")]
    universe_ids: Option<String>,
}

async fn thumbnails_proxy(
    State(state): State<SharedState>,
    Query(query): Query<ThumbnailsQuery>,
) -> Response {
    let ids = query.universe_ids.unwrap_or_default();
    let ids = ids.trim();
    if ids.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "universeIds query parameter is required",
        );
    }

    if let Some(cached) = state.cached_thumbnails(ids) {
        return (StatusCode::OK, axum::Json((*cached).clone())).into_response();
    }

    match thumbnails::fetch_game_icons(&state.http, ids).await {
        Ok(payload) => {
            state.store_thumbnails(ids.to_string(), Arc::new(payload.clone()));
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Thumbnail upstream call failed");
            error_response(StatusCode::BAD_GATEWAY, "thumbnail upstream failed")
        }
    }
}

async fn healthz(State(state): State<SharedState>) -> Response {
    let latest = state.latest().await;
    let body = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "lastGeneratedAt": latest.as_ref().map(|s| s.generatedAt.clone()),
        "lastRefreshError": state.last_refresh_error().await,
    });
    (StatusCode::OK, axum::Json(body)).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}
