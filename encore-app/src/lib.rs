//! HTTP surface of the Encore event extractor.
//!
//! `GET /api/save-entity?url=` renders a page, extracts its event and stores
//! it; `GET /api/get-entity?url=` returns the latest stored record.

pub mod api;
pub mod pipeline;

use axum::Router;
use axum::routing::get;
use pipeline::Pipeline;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/save-entity", get(api::save_entity))
        .route("/api/get-entity", get(api::get_entity))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
