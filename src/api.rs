use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header::HeaderName, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use crate::digest::{ChannelConfig, Digest, DigestOptions, DigestService};
use crate::render::render_page;

pub const CACHE_HEADER: &str = "x-digest-cache";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DigestService>,
    pub channels: Arc<Vec<ChannelConfig>>,
}

impl AppState {
    pub fn new(service: Arc<DigestService>, channels: Vec<ChannelConfig>) -> Self {
        Self {
            service,
            channels: Arc::new(channels),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(digest_page))
        .route("/health", get(|| async { "OK" }))
        .route("/api/digest", get(digest_json))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Accepts `refresh=1|true|yes` (case-insensitive).
fn wants_refresh(q: &HashMap<String, String>) -> bool {
    q.get("refresh")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[derive(serde::Serialize)]
struct DigestResp<'a> {
    last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    digest: &'a Digest,
}

async fn digest_json(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let opts = DigestOptions {
        force_refresh: wants_refresh(&q),
    };
    match state
        .service
        .produce_digest_with_status(&state.channels, opts)
        .await
    {
        Ok(outcome) => {
            let body = DigestResp {
                last_updated: state.service.last_capture(),
                digest: outcome.digest.as_ref(),
            };
            (
                [(HeaderName::from_static(CACHE_HEADER), outcome.served.as_header())],
                Json(body),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "digest unavailable");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn digest_page(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let opts = DigestOptions {
        force_refresh: wants_refresh(&q),
    };
    match state.service.produce_digest(&state.channels, opts).await {
        Ok(digest) => Html(render_page(
            &digest,
            state.service.last_capture(),
            Utc::now(),
        ))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "digest unavailable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "digest temporarily unavailable",
            )
                .into_response()
        }
    }
}
