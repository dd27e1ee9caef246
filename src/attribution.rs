//! Attribution shaping for upstream photo records.
//!
//! Unsplash requires photographer links to carry referral parameters. Every
//! record passes through [`sanitize_photo`] before it reaches a client, which
//! fills display defaults and normalizes the profile URL.

use crate::models::ImageRecord;
use crate::unsplash::UnsplashPhoto;

/// Marker that identifies our referral parameters.
pub const REFERRAL_MARKER: &str = "utm_source=zen-writing";

/// Full query fragment appended to profile links.
pub const REFERRAL_PARAMS: &str = "utm_source=zen-writing&utm_medium=referral";

pub const PROFILE_BASE_URL: &str = "https://unsplash.com/@";

const FALLBACK_ALT: &str = "Unsplash image";
const FALLBACK_PHOTOGRAPHER: &str = "Unknown";

/// Append the referral parameters unless they are already present.
/// Applying this twice gives the same URL as applying it once.
pub fn with_referral(url: &str) -> String {
    if url.contains(REFERRAL_MARKER) {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, REFERRAL_PARAMS)
}

/// Resolve the photographer profile link for a record.
///
/// A missing profile is synthesized from the username when one is known.
pub fn normalize_profile_url(profile: Option<&str>, username: Option<&str>) -> Option<String> {
    let profile = profile.map(str::trim).filter(|p| !p.is_empty());
    let username = username.map(str::trim).filter(|u| !u.is_empty());

    match (profile, username) {
        (Some(p), _) => Some(with_referral(p)),
        (None, Some(u)) => Some(with_referral(&format!(
            "{}{}",
            PROFILE_BASE_URL,
            urlencoding::encode(u)
        ))),
        (None, None) => None,
    }
}

/// Turn an upstream photo into the record the proxy hands out.
pub fn sanitize_photo(photo: UnsplashPhoto) -> ImageRecord {
    let user = photo.user.unwrap_or_default();
    let username = user.username.filter(|u| !u.is_empty());
    let profile = user.links.and_then(|l| l.html);

    let alt_description = photo
        .alt_description
        .filter(|a| !a.is_empty())
        .or(photo.description.filter(|d| !d.is_empty()))
        .unwrap_or_else(|| FALLBACK_ALT.to_string());

    ImageRecord {
        photographer_profile: normalize_profile_url(profile.as_deref(), username.as_deref()),
        id: photo.id,
        url: photo.urls.regular,
        alt_description,
        photographer_name: user
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| FALLBACK_PHOTOGRAPHER.to_string()),
        photographer_username: username,
        download_location: photo.links.and_then(|l| l.download_location),
    }
}
