//! Data models for the writing companion.
//!
//! This module contains the core data structures shared by the keyword,
//! gallery, layout and viewport code, plus the request/response bodies of
//! the proxy API.

use serde::{Deserialize, Serialize};

// ============================================================================
// Keyword Colors
// ============================================================================

/// Highlight color assigned to a keyword. The palette has two entries.
/// Serialized as its hex code so the page can paint it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorToken {
    Mint,
    Sky,
}

impl ColorToken {
    /// Color used for empty keywords and for even hashes.
    pub const DEFAULT: ColorToken = ColorToken::Mint;

    pub fn hex(self) -> &'static str {
        match self {
            ColorToken::Mint => "#CEE8D7",
            ColorToken::Sky => "#CAE2FF",
        }
    }
}

impl Serialize for ColorToken {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.hex())
    }
}

// ============================================================================
// Images
// ============================================================================

/// A sanitized image search result. Field names follow the proxy's JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub url: String,
    pub alt_description: String,
    pub photographer_name: String,
    #[serde(default)]
    pub photographer_username: Option<String>,
    /// Profile link carrying the referral marker exactly once.
    #[serde(default)]
    pub photographer_profile: Option<String>,
    /// Opaque reference for the download-tracking endpoint.
    #[serde(default)]
    pub download_location: Option<String>,
}

/// One image bound to the keyword it was fetched for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryItem {
    #[serde(flatten)]
    pub image: ImageRecord,
    pub keyword: String,
    #[serde(rename = "keywordColor")]
    pub color: ColorToken,
}

impl GalleryItem {
    pub fn id(&self) -> &str {
        &self.image.id
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    /// Bounding box every display size is fitted into.
    pub const MAX: Size = Size {
        width: 300.0,
        height: 400.0,
    };

    /// Used when an image cannot be measured.
    pub const DEFAULT: Size = Size::MAX;

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Camera over the canvas: scale around the viewport center, then offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ViewportTransform {
    pub const IDENTITY: ViewportTransform = ViewportTransform {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Error,
}

/// Transient, auto-dismissed message shown to the writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

// ============================================================================
// Proxy API Bodies
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ImagesQuery {
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesResponse {
    pub images: Vec<ImageRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackDownloadRequest {
    pub download_location: Option<String>,
}
