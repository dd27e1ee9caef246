//! Display-size resolution for gallery images.
//!
//! The layout needs every card's size before it can place anything. Sizes
//! come from the image's natural dimensions, fitted into [`Size::MAX`], and
//! are cached by image id for as long as the image stays in the gallery.

use crate::models::{GalleryItem, Size};
use crate::url_validator::validate_image_url;
use std::collections::HashMap;
use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Scale a natural size to the card width, then clamp the height, keeping the
/// aspect ratio. Degenerate sizes give [`Size::DEFAULT`].
pub fn fit_within(natural_width: f64, natural_height: f64) -> Size {
    if !(natural_width > 0.0 && natural_height > 0.0)
        || !natural_width.is_finite()
        || !natural_height.is_finite()
    {
        return Size::DEFAULT;
    }
    let aspect = natural_width / natural_height;

    let mut width = Size::MAX.width;
    let mut height = width / aspect;
    if height > Size::MAX.height {
        height = Size::MAX.height;
        width = height * aspect;
    }

    Size::new(width, height)
}

/// Produces the display size for an image URL. Exactly one answer per call:
/// failures resolve to [`Size::DEFAULT`] instead of erroring.
pub trait SizeResolver: Send + Sync + 'static {
    fn resolve(&self, url: &str) -> impl Future<Output = Size> + Send;
}

/// Downloads the image and reads its dimensions from the encoded header.
#[derive(Clone)]
pub struct HttpSizeResolver {
    http: reqwest::Client,
}

impl HttpSizeResolver {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { http })
    }

    async fn natural_dimensions(&self, url: &str) -> Result<(u32, u32), String> {
        let owned = url.to_string();
        let url = tokio::task::spawn_blocking(move || validate_image_url(&owned))
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;

        image::io::Reader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .into_dimensions()
            .map_err(|e| e.to_string())
    }
}

impl SizeResolver for HttpSizeResolver {
    async fn resolve(&self, url: &str) -> Size {
        match self.natural_dimensions(url).await {
            Ok((w, h)) => fit_within(w as f64, h as f64),
            Err(e) => {
                log::debug!("size fallback for {}: {}", url, e);
                Size::DEFAULT
            }
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Image id -> resolved display size.
#[derive(Debug, Clone, Default)]
pub struct SizeCache {
    sizes: HashMap<String, Size>,
}

impl SizeCache {
    pub fn get(&self, id: &str) -> Option<Size> {
        self.sizes.get(id).copied()
    }

    /// Record a size. The first answer for an id wins.
    pub fn insert(&mut self, id: &str, size: Size) -> bool {
        if self.sizes.contains_key(id) {
            return false;
        }
        self.sizes.insert(id.to_string(), size);
        true
    }

    /// Drop every entry whose image is no longer in `gallery`.
    pub fn retain_gallery(&mut self, gallery: &[GalleryItem]) {
        self.sizes
            .retain(|id, _| gallery.iter().any(|item| item.id() == id));
    }

    /// Items whose size is still unknown, first occurrence of each id only.
    pub fn missing<'a>(&self, gallery: &'a [GalleryItem]) -> Vec<&'a GalleryItem> {
        let mut missing: Vec<&'a GalleryItem> = Vec::new();
        for item in gallery {
            if self.sizes.contains_key(item.id()) || missing.iter().any(|m| m.id() == item.id()) {
                continue;
            }
            missing.push(item);
        }
        missing
    }

    /// Sizes for every item in gallery order, or `None` while any is unknown.
    pub fn sizes_for(&self, gallery: &[GalleryItem]) -> Option<Vec<Size>> {
        gallery.iter().map(|item| self.get(item.id())).collect()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}
