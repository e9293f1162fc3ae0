//! HTTP request handlers.

use crate::page;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use rate_sampler::QueryService;
use std::time::Duration;
use tracing::{debug, error};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
    /// How often the page re-polls `/data`; matches the tick interval.
    pub refresh: Duration,
}

impl AppState {
    pub fn new(query: QueryService, refresh: Duration) -> Self {
        Self { query, refresh }
    }
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Server Error").into_response()
}

/// GET / - Chart page seeded with the current view.
pub async fn index(State(state): State<AppState>) -> Response {
    let view = state.query.current_view();
    match page::render(&view, state.refresh) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template rendering error: {e}");
            server_error()
        }
    }
}

/// GET /data - Current view as JSON.
pub async fn data(State(state): State<AppState>) -> Response {
    let view = state.query.current_view();
    debug!(samples = view.timestamps.len(), status = %view.status, "serving /data");

    match serde_json::to_vec(&view) {
        Ok(body) => (StatusCode::OK, [(CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("JSON encoding error: {e}");
            server_error()
        }
    }
}
