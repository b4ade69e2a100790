//! Reelcrawl: scrapes movie and series download sites into one record format.
//!
//! The [`engine`] module holds the site adapters and the two-phase scrape
//! orchestrator. [`routes`] exposes it over HTTP and [`downloader`] fetches
//! the files a scrape resolves.

pub mod downloader;
pub mod engine;
pub mod error;
pub mod logging;
pub mod routes;
pub mod settings;

use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    downloader::DownloadManager,
    engine::{EngineRegistry, HttpTransport, Scraper, Transport},
    error::AppError,
    settings::Settings,
};

/// JSON envelope for every API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 200 response carrying `data`
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct Ctx {
    pub settings: Arc<Settings>,
    pub registry: Arc<EngineRegistry>,
    /// Plain transport, kept concrete for cache maintenance
    pub http: Arc<HttpTransport>,
    pub scraper: Arc<Scraper>,
    pub downloads: Arc<DownloadManager>,
}

impl Ctx {
    /// Build the engine, transports and download manager from `settings`
    pub fn from_settings(settings: Settings) -> Result<Self, AppError> {
        let http = Arc::new(HttpTransport::with_config(&settings.engine.http_config())?);

        let transport: Arc<dyn Transport> = http.clone();
        let mut scraper = Scraper::with_config(transport, settings.engine.scraper_config());
        if let Some(solver) = &settings.engine.challenge_solver_url {
            scraper =
                scraper.with_challenge_solver(solver.clone(), settings.engine.request_timeout());
        }

        let downloads = DownloadManager::new(&settings.download)?;

        Ok(Self::new(
            settings,
            EngineRegistry::with_defaults(),
            http,
            scraper,
            downloads,
        ))
    }

    pub fn new(
        settings: Settings,
        registry: EngineRegistry,
        http: Arc<HttpTransport>,
        scraper: Scraper,
        downloads: DownloadManager,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            registry: Arc::new(registry),
            http,
            scraper: Arc::new(scraper),
            downloads: Arc::new(downloads),
        }
    }
}
