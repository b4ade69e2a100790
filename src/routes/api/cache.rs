use axum::{Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ApiResponse, ApiResult, Ctx};

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheResponse {
    /// Pages held in the cache after the request
    pub pages: u64,
}

// ============ Handlers ============

/// Page cache statistics
/// GET /api/cache
async fn cache_stats(State(ctx): State<Ctx>) -> ApiResult<CacheResponse> {
    Ok(ApiResponse::ok(
        "Cache retrieved",
        CacheResponse {
            pages: ctx.http.cached_pages().await,
        },
    ))
}

/// Drop every cached page
/// DELETE /api/cache
async fn clear_cache(State(ctx): State<Ctx>) -> ApiResult<CacheResponse> {
    let before = ctx.http.cached_pages().await;
    ctx.http.clear_cache().await;
    info!("Cleared {} cached pages", before);

    Ok(ApiResponse::ok(
        "Cache cleared",
        CacheResponse {
            pages: ctx.http.cached_pages().await,
        },
    ))
}

pub fn mount() -> Router<Ctx> {
    Router::new().route("/cache", get(cache_stats).delete(clear_cache))
}
