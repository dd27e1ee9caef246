//! Unsplash API client and the image search boundary.
//!
//! [`ImageSearch`] is the seam the gallery pipeline depends on. The
//! production implementation, [`UnsplashClient`], talks to the Unsplash REST
//! API and sanitizes every photo before handing it out; tests substitute
//! in-memory fakes.

use crate::attribution::sanitize_photo;
use crate::models::ImageRecord;
use crate::url_validator::{validate_tracking_url, UrlValidationError};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

pub const UNSPLASH_SEARCH_URL: &str = "https://api.unsplash.com/search/photos";

/// Candidate pool size requested per keyword.
pub const RESULTS_PER_PAGE: u32 = 6;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Upstream Payloads
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UnsplashSearchResponse {
    #[serde(default)]
    pub results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnsplashPhoto {
    pub id: String,
    pub urls: PhotoUrls,
    #[serde(default)]
    pub alt_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub links: Option<PhotoLinks>,
    #[serde(default)]
    pub user: Option<UnsplashUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoUrls {
    pub regular: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoLinks {
    #[serde(default)]
    pub download_location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnsplashUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub links: Option<UserLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserLinks {
    #[serde(default)]
    pub html: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone)]
pub enum SearchError {
    /// Blank keyword
    MissingKeyword,
    /// No access key configured
    NotConfigured,
    /// Upstream 401
    Unauthorized { details: Value },
    /// Upstream 403
    Forbidden { details: Value },
    /// Upstream 429
    RateLimited { details: Value },
    /// Any other non-success upstream status
    Upstream { status: u16, details: Value },
    /// Connection, TLS or timeout failure
    Transport(String),
    /// Upstream answered with a body we could not decode
    InvalidResponse(String),
}

impl SearchError {
    pub fn from_upstream(status: u16, details: Value) -> Self {
        match status {
            401 => SearchError::Unauthorized { details },
            403 => SearchError::Forbidden { details },
            429 => SearchError::RateLimited { details },
            _ => SearchError::Upstream { status, details },
        }
    }

    /// HTTP status the proxy answers with.
    pub fn status(&self) -> u16 {
        match self {
            SearchError::MissingKeyword => 400,
            SearchError::Unauthorized { .. } => 401,
            SearchError::Forbidden { .. } => 403,
            SearchError::RateLimited { .. } => 429,
            SearchError::Upstream { status, .. } => *status,
            SearchError::NotConfigured
            | SearchError::Transport(_)
            | SearchError::InvalidResponse(_) => 500,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            SearchError::Unauthorized { details }
            | SearchError::Forbidden { details }
            | SearchError::RateLimited { details }
            | SearchError::Upstream { details, .. } => Some(details),
            _ => None,
        }
    }
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::MissingKeyword => write!(f, "Keyword is required"),
            SearchError::NotConfigured => write!(f, "Unsplash API key not configured"),
            SearchError::Unauthorized { .. } => write!(f, "Unauthorized. Invalid Unsplash API key."),
            SearchError::Forbidden { .. } => write!(
                f,
                "Access denied. Please check your Unsplash API key and permissions."
            ),
            SearchError::RateLimited { .. } => {
                write!(f, "Rate limit exceeded. Please try again later.")
            }
            SearchError::Upstream { .. } => write!(f, "Failed to fetch images from Unsplash"),
            SearchError::Transport(_) | SearchError::InvalidResponse(_) => {
                write!(f, "Internal server error")
            }
        }
    }
}

impl std::error::Error for SearchError {}

#[derive(Debug, Clone)]
pub enum TrackError {
    MissingLocation,
    NotConfigured,
    InvalidLocation(UrlValidationError),
    Upstream { status: u16, details: Value },
    Transport(String),
}

impl TrackError {
    pub fn status(&self) -> u16 {
        match self {
            TrackError::MissingLocation | TrackError::InvalidLocation(_) => 400,
            TrackError::Upstream { status, .. } => *status,
            TrackError::NotConfigured | TrackError::Transport(_) => 500,
        }
    }
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackError::MissingLocation => write!(f, "download_location is required"),
            TrackError::NotConfigured => write!(f, "Unsplash API key not configured"),
            TrackError::InvalidLocation(e) => write!(f, "Invalid download_location: {}", e),
            TrackError::Upstream { .. } => write!(f, "Failed to track download"),
            TrackError::Transport(_) => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for TrackError {}

// ============================================================================
// Search Boundary
// ============================================================================

/// Keyword image search plus the download-tracking call required by the
/// provider's terms.
pub trait ImageSearch: Send + Sync + 'static {
    /// Candidate images for one keyword. An empty list is a valid answer.
    fn search(
        &self,
        keyword: &str,
    ) -> impl Future<Output = Result<Vec<ImageRecord>, SearchError>> + Send;

    /// Notify the provider that an image was used.
    fn track_download(
        &self,
        download_location: &str,
    ) -> impl Future<Output = Result<Value, TrackError>> + Send;
}

// ============================================================================
// Unsplash Client
// ============================================================================

#[derive(Clone)]
pub struct UnsplashClient {
    http: reqwest::Client,
    access_key: Option<String>,
    search_url: String,
}

impl UnsplashClient {
    pub fn new(access_key: Option<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            access_key,
            search_url: UNSPLASH_SEARCH_URL.to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.access_key.is_some()
    }

    fn auth_header(&self) -> Option<String> {
        self.access_key.as_ref().map(|k| format!("Client-ID {}", k))
    }
}

async fn error_details(response: reqwest::Response) -> Value {
    response.json::<Value>().await.unwrap_or(Value::Null)
}

impl ImageSearch for UnsplashClient {
    async fn search(&self, keyword: &str) -> Result<Vec<ImageRecord>, SearchError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(SearchError::MissingKeyword);
        }
        let auth = self.auth_header().ok_or(SearchError::NotConfigured)?;

        let per_page = RESULTS_PER_PAGE.to_string();
        let response = self
            .http
            .get(&self.search_url)
            .query(&[
                ("query", keyword),
                ("per_page", per_page.as_str()),
                ("orientation", "portrait"),
                ("content_filter", "high"),
            ])
            .header(AUTHORIZATION, auth)
            .header("Accept-Version", "v1")
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let details = error_details(response).await;
            log::warn!("Unsplash search for {:?} failed with {}", keyword, status);
            return Err(SearchError::from_upstream(status.as_u16(), details));
        }

        let body: UnsplashSearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(body.results.into_iter().map(sanitize_photo).collect())
    }

    async fn track_download(&self, download_location: &str) -> Result<Value, TrackError> {
        let location = download_location.trim().to_string();
        if location.is_empty() {
            return Err(TrackError::MissingLocation);
        }
        let auth = self.auth_header().ok_or(TrackError::NotConfigured)?;

        // DNS lookup in the validator blocks
        let url = tokio::task::spawn_blocking(move || validate_tracking_url(&location))
            .await
            .map_err(|e| TrackError::Transport(e.to_string()))?
            .map_err(TrackError::InvalidLocation)?;

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, auth)
            .header("Accept-Version", "v1")
            .send()
            .await
            .map_err(|e| TrackError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let details = error_details(response).await;
            log::warn!("Unsplash download tracking failed with {}", status);
            return Err(TrackError::Upstream {
                status: status.as_u16(),
                details,
            });
        }

        Ok(response.json::<Value>().await.unwrap_or(Value::Null))
    }
}

/// Fire one tracking call per tracked image and wait for all of them.
///
/// Best effort: failures are logged and otherwise ignored. Returns the number
/// of calls that succeeded.
pub async fn track_downloads<S: ImageSearch>(search: &S, images: &[ImageRecord]) -> usize {
    let calls = images
        .iter()
        .filter_map(|image| image.download_location.as_deref())
        .map(|location| search.track_download(location));

    let results = futures_util::future::join_all(calls).await;
    results
        .into_iter()
        .filter(|r| match r {
            Ok(_) => true,
            Err(e) => {
                log::debug!("download tracking skipped: {}", e);
                false
            }
        })
        .count()
}
