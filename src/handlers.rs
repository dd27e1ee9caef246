//! HTTP route handlers: the image search proxy, download tracking, health and
//! the writer page.

use crate::models::{ImagesQuery, ImagesResponse, TrackDownloadRequest};
use crate::templates::render_writer_page;
use crate::unsplash::{ImageSearch, SearchError, TrackError};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

// ============================================================================
// Error Responses
// ============================================================================

fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn error_body(error: &str, details: Option<&Value>) -> Value {
    match details {
        Some(details) if !details.is_null() => json!({ "error": error, "details": details }),
        _ => json!({ "error": error }),
    }
}

pub fn search_error_response(err: &SearchError) -> Response {
    let body = match err {
        SearchError::Transport(message) | SearchError::InvalidResponse(message) => {
            json!({ "error": err.to_string(), "message": message })
        }
        _ => error_body(&err.to_string(), err.details()),
    };
    (status_of(err.status()), Json(body)).into_response()
}

pub fn track_error_response(err: &TrackError) -> Response {
    let body = match err {
        TrackError::Transport(message) => {
            json!({ "error": err.to_string(), "message": message })
        }
        TrackError::Upstream { details, .. } => error_body(&err.to_string(), Some(details)),
        _ => error_body(&err.to_string(), None),
    };
    (status_of(err.status()), Json(body)).into_response()
}

// ============================================================================
// Routes
// ============================================================================

/// GET / - the writer page.
pub async fn index() -> Html<String> {
    Html(render_writer_page())
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/images?keyword=...
pub async fn images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImagesQuery>,
) -> Response {
    let keyword = query.keyword.unwrap_or_default();
    match state.search.search(&keyword).await {
        Ok(images) => Json(ImagesResponse { images }).into_response(),
        Err(e) => {
            if e.status() >= 500 {
                log::warn!("image search for {:?} failed: {}", keyword, e);
            }
            search_error_response(&e)
        }
    }
}

/// POST /api/track-download
pub async fn track_download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TrackDownloadRequest>,
) -> Response {
    let location = body.download_location.unwrap_or_default();
    match state.search.track_download(&location).await {
        Ok(data) => Json(json!({ "success": true, "data": data })).into_response(),
        Err(e) => {
            log::debug!("download tracking rejected: {}", e);
            track_error_response(&e)
        }
    }
}
