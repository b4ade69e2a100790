use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::search::scrape;
use crate::{
    ApiResponse, ApiResult, Ctx,
    downloader::{DownloadEntry, DownloadError},
    engine::{Movie, ScrapeRequest},
    error::ApiError,
};

/// Download request: the record is resolved by a fresh search or listing
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub engine: Option<String>,
    /// Search query; lists recent uploads when absent
    pub query: Option<String>,
    pub page: Option<u32>,
    /// Exact title of the record to download
    pub title: String,
}

/// Outcome of one resumed download
#[derive(Debug, Serialize, Deserialize)]
pub struct ResumeOutcome {
    pub title: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadsResponse {
    pub downloads: Vec<DownloadEntry>,
    pub pending: usize,
}

// ============ Handlers ============

/// Start a download in the background
/// POST /api/downloads
async fn start_download(
    State(ctx): State<Ctx>,
    Json(req): Json<DownloadRequest>,
) -> ApiResult<Movie> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()).into());
    }

    let page = req.page.unwrap_or(1);
    let request = match req.query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => ScrapeRequest::search(query, page),
        _ => ScrapeRequest::list(page),
    };

    let result = scrape(&ctx, req.engine.as_deref(), &request).await?;
    let movie = result.get_by_title(title)?.clone();

    if movie.is_series || movie.download_link.is_none() {
        return Err(DownloadError::NoDownloadLink(movie.title).into());
    }

    let downloads = ctx.downloads.clone();
    let queued = movie.clone();
    tokio::spawn(async move {
        if let Err(e) = downloads.download(&queued).await {
            warn!("Background download of {} failed: {}", queued.title, e);
        }
    });
    info!("Queued download of {}", movie.title);

    Ok(ApiResponse {
        code: 202,
        message: "Download started".to_string(),
        data: Some(movie),
    })
}

/// Everything in the resume list
/// GET /api/downloads
async fn list_downloads(State(ctx): State<Ctx>) -> ApiResult<DownloadsResponse> {
    let list = ctx.downloads.resume_list();
    Ok(ApiResponse::ok(
        "Downloads retrieved",
        DownloadsResponse {
            downloads: list.all(),
            pending: list.pending().len(),
        },
    ))
}

/// Continue every unfinished download in the resume list
/// POST /api/downloads/resume
async fn resume_downloads(State(ctx): State<Ctx>) -> ApiResult<Vec<ResumeOutcome>> {
    let outcomes: Vec<ResumeOutcome> = ctx
        .downloads
        .resume_pending()
        .await
        .into_iter()
        .map(|(title, result)| match result {
            Ok(_) => ResumeOutcome {
                title,
                completed: true,
                error: None,
            },
            Err(e) => ResumeOutcome {
                title,
                completed: false,
                error: Some(e.to_string()),
            },
        })
        .collect();
    info!("Resumed {} downloads", outcomes.len());

    Ok(ApiResponse::ok("Downloads resumed", outcomes))
}

pub fn mount() -> Router<Ctx> {
    Router::new()
        .route("/downloads", get(list_downloads).post(start_download))
        .route("/downloads/resume", post(resume_downloads))
}
