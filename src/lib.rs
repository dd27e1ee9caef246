//! AuraScribe library - re-exports for testing and external use.
//!
//! The writing companion turns the keywords of a draft into a live mood
//! board. This crate holds the pure core (keyword extraction, color
//! assignment, layout packing, viewport math), the debounced fetch pipeline,
//! the per-connection writer session and the Unsplash proxy routes.

use std::sync::Arc;

pub mod attribution;
pub mod config;
pub mod handlers;
pub mod keywords;
pub mod layout;
pub mod models;
pub mod reconciler;
pub mod session;
pub mod sizes;
pub mod state;
pub mod templates;
pub mod unsplash;
pub mod url_validator;
pub mod viewport;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub search: Arc<unsplash::UnsplashClient>,
    pub sizes: Arc<sizes::HttpSizeResolver>,
}

impl AppState {
    pub fn new(config: config::Config) -> Result<Self, reqwest::Error> {
        let search = unsplash::UnsplashClient::new(config.access_key.clone())?;
        let sizes = sizes::HttpSizeResolver::new()?;
        Ok(Self {
            config,
            search: Arc::new(search),
            sizes: Arc::new(sizes),
        })
    }
}

// Re-export commonly used types
pub use models::{
    ColorToken, GalleryItem, ImageRecord, Notification, NotificationKind, Position, Size,
    ViewportTransform,
};

pub use keywords::{
    current_keyword, extract_keywords, highlight_spans, keyword_color, keyword_color_map,
    locate_caret, CaretPosition, TextSpan,
};

pub use layout::{calculate_layout, CanvasPreset, Layout, LayoutConfig};

pub use reconciler::{fetch_gallery, FetchOutcome, FetchReconciler, ReconcileEvent, ReconcilerConfig};

pub use session::{ClientMessage, ServerMessage, SessionConfig, WriterSession};

pub use sizes::{fit_within, HttpSizeResolver, SizeCache, SizeResolver};

pub use state::{Action, Effect, WriterSnapshot, WriterState};

pub use unsplash::{track_downloads, ImageSearch, SearchError, TrackError, UnsplashClient};

pub use url_validator::{validate_image_url, validate_tracking_url, UrlValidationError};

pub use viewport::{focus_item, focus_transform, Viewport};
