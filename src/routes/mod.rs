use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, Method, header::HeaderName},
    middleware::{self, Next},
    response::Response,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{Ctx, error::ApiError};

pub mod api;

/// Header carrying the client's API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Build the application router
pub fn router(ctx: Ctx) -> Router {
    let api = api::mount().layer(middleware::from_fn_with_state(
        ctx.clone(),
        require_api_key,
    ));

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(&ctx.settings.api.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Reject requests without an allow-listed `x-api-key` when keys are configured
async fn require_api_key(
    State(ctx): State<Ctx>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let allowed = &ctx.settings.api.allowed_keys;
    if allowed.is_empty() {
        return Ok(next.run(request).await);
    }

    let key = request
        .headers()
        .get(HeaderName::from_static(API_KEY_HEADER))
        .and_then(|v| v.to_str().ok());

    match key {
        Some(key) if allowed.iter().any(|k| k == key) => Ok(next.run(request).await),
        Some(_) => Err(ApiError::Unauthorized("invalid API key".to_string())),
        None => Err(ApiError::Unauthorized(format!("missing {API_KEY_HEADER} header"))),
    }
}
