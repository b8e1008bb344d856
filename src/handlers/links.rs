use crate::{error::ApiError, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Request / response bodies ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ShortenRequest {
    long_url: Option<String>,
    /// Host to put in front of the code instead of the configured website.
    diy_domain: Option<String>,
}

#[derive(Serialize)]
pub struct ShortenResponse {
    short_url: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    short_url: String,
    long_url: String,
    visit_count: u64,
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// GET /healthy
pub async fn healthy() -> Json<&'static str> {
    Json("ok")
}

/// POST /shorten
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Json<ShortenResponse>, ApiError> {
    let Json(req) = payload?;
    let long_url = req.long_url.unwrap_or_default();

    let short_url = state
        .links
        .create(&long_url, req.diy_domain.as_deref())
        .await?;

    Ok(Json(ShortenResponse { short_url }))
}

/// GET /stats/:code
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.links.stats(&code).await?;

    Ok(Json(StatsResponse {
        short_url: stats.short_url,
        long_url: stats.long_url,
        visit_count: stats.visits,
    }))
}
