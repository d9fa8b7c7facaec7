//! Liveness and static reference data

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{json_response, FullBody};
use crate::model::Category;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Document store backend in use
    pub backend: &'static str,
    pub timestamp: String,
}

/// GET /health
pub fn health_check(state: &AppState) -> Response<FullBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            backend: state.backend,
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}

/// GET /categories
pub fn handle_categories() -> Response<FullBody> {
    json_response(StatusCode::OK, &Category::ALL)
}
