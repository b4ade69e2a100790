use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::{
    ApiResponse, ApiResult, Ctx,
    engine::{ScrapeRequest, SearchResult, SiteAdapter},
    error::{ApiError, AppError},
};

/// Search request parameters
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    /// Engine name, case-insensitive (default from settings)
    pub engine: Option<String>,
    /// Page number, 1-based
    pub page: Option<String>,
}

/// Listing request parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub engine: Option<String>,
    pub page: Option<String>,
}

/// Parse a 1-based page number; absent means page 1
pub(crate) fn parse_page(page: Option<&str>) -> Result<u32, ApiError> {
    match page.map(str::trim) {
        None | Some("") => Ok(1),
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|page| *page >= 1)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid page: {raw}"))),
    }
}

/// Look up `engine`, falling back to the configured default
pub(crate) fn resolve_engine(
    ctx: &Ctx,
    engine: Option<&str>,
) -> Result<Box<dyn SiteAdapter>, AppError> {
    let name = engine
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(ctx.settings.engine.default_engine.as_str());
    Ok(ctx.registry.lookup(name)?)
}

/// Scrape with `request` through the engine named `engine`
pub(crate) async fn scrape(
    ctx: &Ctx,
    engine: Option<&str>,
    request: &ScrapeRequest,
) -> Result<SearchResult, AppError> {
    let adapter = resolve_engine(ctx, engine)?;
    Ok(ctx.scraper.run(adapter.as_ref(), request).await?)
}

// ============ Handlers ============

/// Search one site
/// GET /api/search?query=...&engine=...&page=...
async fn search(
    State(ctx): State<Ctx>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResult> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("query is required".to_string()))?;
    let page = parse_page(params.page.as_deref())?;

    let result = scrape(
        &ctx,
        params.engine.as_deref(),
        &ScrapeRequest::search(query, page),
    )
    .await?;

    Ok(ApiResponse::ok("Search completed", result))
}

/// Recent uploads of one site
/// GET /api/list?engine=...&page=...
async fn list(State(ctx): State<Ctx>, Query(params): Query<ListQuery>) -> ApiResult<SearchResult> {
    let page = parse_page(params.page.as_deref())?;

    let result = scrape(&ctx, params.engine.as_deref(), &ScrapeRequest::list(page)).await?;

    Ok(ApiResponse::ok("List completed", result))
}

pub fn mount() -> Router<Ctx> {
    Router::new()
        .route("/search", get(search))
        .route("/list", get(list))
}
