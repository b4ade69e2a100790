use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::{
    ApiResponse, downloader::DownloadError, engine::EngineError, settings::SettingsError,
};

/// Errors raised by request handling itself
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    ApiError(#[from] ApiError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status reported for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ApiError(ApiError::BadRequest(_)) => StatusCode::BAD_REQUEST,
            Self::ApiError(ApiError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            Self::ApiError(ApiError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Engine(e) => match e {
                EngineError::UnknownEngine(_) | EngineError::InvalidMode { .. } => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                e if e.is_transport() => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Download(DownloadError::NoDownloadLink(_)) => StatusCode::BAD_REQUEST,
            Self::Download(_) | Self::Settings(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        let body = ApiResponse::<()> {
            code: status.as_u16(),
            message: self.to_string(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
