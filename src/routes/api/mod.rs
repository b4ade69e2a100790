use axum::Router;

use crate::Ctx;

pub mod cache;
pub mod downloads;
pub mod engines;
pub mod health;
pub mod search;

/// Mount all API routes
pub fn mount() -> Router<Ctx> {
    Router::new()
        .merge(health::mount())
        .merge(engines::mount())
        .merge(search::mount())
        .merge(downloads::mount())
        .merge(cache::mount())
}
