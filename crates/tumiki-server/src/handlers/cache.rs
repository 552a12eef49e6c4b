//! Admin routes over the read-through cache.

use axum::extract::{Path, State};
use serde::Serialize;
use tumiki_api::Success;
use tumiki_auth::AdminAuth;

use crate::cache::CacheStats;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearAllResponse {
    pub cleared: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearOneResponse {
    pub key: String,
    pub cleared: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: CacheStats,
}

/// `GET /api/cache`
pub async fn stats(State(state): State<AppState>, AdminAuth(_claims): AdminAuth) -> Success<StatsResponse> {
    state.cache.cleanup_expired();
    Success(StatsResponse {
        stats: state.cache.stats(),
    })
}

/// `DELETE /api/cache`
pub async fn clear_all(
    State(state): State<AppState>,
    AdminAuth(claims): AdminAuth,
) -> Success<ClearAllResponse> {
    let cleared = state.cache.clear_all();
    tracing::info!(subject = %claims.subject(), cleared, "cache cleared by admin");
    Success(ClearAllResponse { cleared })
}

/// `DELETE /api/cache/{key}`
pub async fn clear_one(
    State(state): State<AppState>,
    AdminAuth(claims): AdminAuth,
    Path(key): Path<String>,
) -> Success<ClearOneResponse> {
    let cleared = state.cache.clear(&key);
    tracing::info!(subject = %claims.subject(), key = %key, cleared, "cache entry cleared by admin");
    Success(ClearOneResponse { key, cleared })
}
