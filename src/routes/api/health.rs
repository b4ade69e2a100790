use axum::{Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, ApiResult, Ctx};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub engines: usize,
}

/// GET /api/health
async fn health(State(ctx): State<Ctx>) -> ApiResult<HealthResponse> {
    Ok(ApiResponse::ok(
        "OK",
        HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            engines: ctx.registry.len(),
        },
    ))
}

pub fn mount() -> Router<Ctx> {
    Router::new().route("/health", get(health))
}
