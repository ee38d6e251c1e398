//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/api/s3/upload`, `/api/presigned-url`, `/api/s3/delete` - direct-to-storage flow
//! - `/api/upload`, `/api/delete` - server-side batch upload and legacy delete
//! - `/api/characters` - character sheet validation and submission
//! - `/api/health` - Health checks

pub mod characters;
pub mod files;
pub mod health;
pub mod s3;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server);

    Router::new()
        .merge(s3::router(state.clone()))
        .merge(files::router(state.clone()))
        .merge(characters::router(state.clone()))
        .merge(health::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
