//! skyweek-content: weekly astrology content engine
//!
//! Resolves weekly readings and compatibility through tiered sources
//! (in-process cache, document store, AI generation, static library) and
//! serves them over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod resolver;
pub mod scoring;
pub mod services;
pub mod unlock;
pub mod zodiac;

pub use crate::error::{ApiError, ApiResult, ContentError};
pub use crate::resolver::{ContentResolver, Provenance, Resolved};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ContentResolver>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(resolver: ContentResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::sign_routes())
        .merge(api::reading_routes())
        .merge(api::compatibility_routes())
        .merge(api::feature_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
