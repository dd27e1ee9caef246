//! AuraScribe - a writing companion that turns a draft's keywords into a
//! live image mood board.
//!
//! This is the main entry point for the web server.
//! The application is organized into the following modules:
//!
//! - `keywords`: Keyword extraction, colors and text highlighting
//! - `reconciler`: Debounced keyword to gallery fetching
//! - `layout`: Collision-free card packing on the canvas
//! - `viewport`: Camera focus, zoom and pan math
//! - `session`: Per-connection writer session over a WebSocket
//! - `unsplash`: Unsplash search and download tracking
//! - `handlers`: HTTP route handlers

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use aurascribe::{config::Config, handlers, session, AppState};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let addr = config.listen_addr();
    let configured = config.access_key.is_some();

    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            log::error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let app = Router::new()
        // Writer routes
        .route("/", get(handlers::index))
        .route("/ws", get(session::ws_handler))
        // Proxy routes
        .route("/api/images", get(handlers::images))
        .route("/api/track-download", post(handlers::track_download))
        .route("/health", get(handlers::health))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    log::info!("AuraScribe running at http://{}", addr);
    if configured {
        log::info!("Unsplash: ENABLED");
    } else {
        log::warn!("Unsplash: DISABLED (set UNSPLASH_ACCESS_KEY to enable image search)");
    }

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {}", e);
    }
}
