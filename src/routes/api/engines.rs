use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    ApiResponse, ApiResult, Ctx,
    engine::{EngineError, SiteAdapter},
    error::{ApiError, AppError},
};

/// Public description of a registered engine
#[derive(Debug, Serialize, Deserialize)]
pub struct EngineInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub base_url: String,
}

impl From<&dyn SiteAdapter> for EngineInfo {
    fn from(adapter: &dyn SiteAdapter) -> Self {
        Self {
            id: adapter.id().to_string(),
            name: adapter.name().to_string(),
            description: adapter.description().to_string(),
            base_url: adapter.base_url().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnginesResponse {
    pub engines: Vec<EngineInfo>,
    pub default_engine: String,
}

// ============ Handlers ============

/// List every engine
/// GET /api/engines
async fn list_engines(State(ctx): State<Ctx>) -> ApiResult<EnginesResponse> {
    let engines = ctx
        .registry
        .list_all()
        .values()
        .map(|adapter| EngineInfo::from(adapter.as_ref()))
        .collect();

    Ok(ApiResponse::ok(
        "Engines retrieved",
        EnginesResponse {
            engines,
            default_engine: ctx.settings.engine.default_engine.clone(),
        },
    ))
}

/// Describe one engine
/// GET /api/engines/{name}
async fn get_engine(State(ctx): State<Ctx>, Path(name): Path<String>) -> ApiResult<EngineInfo> {
    let adapter = ctx.registry.lookup(&name).map_err(|e| match e {
        EngineError::UnknownEngine(name) => {
            AppError::from(ApiError::NotFound(format!("Engine {name} does not exist")))
        }
        other => AppError::from(other),
    })?;

    Ok(ApiResponse::ok(
        "Engine retrieved",
        EngineInfo::from(adapter.as_ref()),
    ))
}

pub fn mount() -> Router<Ctx> {
    Router::new()
        .route("/engines", get(list_engines))
        .route("/engines/{name}", get(get_engine))
}
