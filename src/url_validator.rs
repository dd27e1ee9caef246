//! URL validation for outbound requests made on behalf of a client.
//!
//! The proxy fetches two kinds of client-supplied URLs: download-tracking
//! references (Unsplash API) and image URLs (Unsplash CDN, for measuring).
//! Both are checked here to prevent Server-Side Request Forgery:
//! - HTTPS-only connections
//! - Per-purpose domain allowlists
//! - Internal IP address blocking (private ranges, loopback, link-local)
//! - DNS rebinding protection

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};
use url::Url;

/// Hosts allowed for download-tracking calls.
const TRACKING_DOMAINS: &[&str] = &["api.unsplash.com"];

/// Hosts allowed for image fetches.
const IMAGE_DOMAINS: &[&str] = &["images.unsplash.com", "plus.unsplash.com"];

#[derive(Debug, Clone, PartialEq)]
pub enum UrlValidationError {
    /// URL is malformed or cannot be parsed
    InvalidUrl(String),
    /// URL uses non-HTTPS scheme
    NotHttps,
    /// Domain is not in the allowlist
    DomainNotAllowed(String),
    /// Resolved IP is a private/internal address
    InternalIpAddress(String),
    /// DNS resolution failed
    DnsResolutionFailed(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlValidationError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            UrlValidationError::NotHttps => write!(f, "Only HTTPS URLs are allowed"),
            UrlValidationError::DomainNotAllowed(domain) => {
                write!(f, "Domain not in allowlist: {}", domain)
            }
            UrlValidationError::InternalIpAddress(ip) => {
                write!(f, "Internal IP addresses are not allowed: {}", ip)
            }
            UrlValidationError::DnsResolutionFailed(msg) => {
                write!(f, "DNS resolution failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for UrlValidationError {}

fn is_internal_ipv4(ip: &Ipv4Addr) -> bool {
    let o = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        // Documentation (192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24)
        || (o[0] == 192 && o[1] == 0 && o[2] == 2)
        || (o[0] == 198 && o[1] == 51 && o[2] == 100)
        || (o[0] == 203 && o[1] == 0 && o[2] == 113)
        // Shared address space (100.64.0.0/10)
        || (o[0] == 100 && (o[1] & 0xC0) == 64)
        // IETF protocol assignments (192.0.0.0/24)
        || (o[0] == 192 && o[1] == 0 && o[2] == 0)
        // Benchmarking (198.18.0.0/15)
        || (o[0] == 198 && (o[1] == 18 || o[1] == 19))
}

fn is_internal_ipv6(ip: &Ipv6Addr) -> bool {
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.to_ipv4_mapped().map(|v4| is_internal_ipv4(&v4)).unwrap_or(false)
        // Unique local (fc00::/7)
        || (ip.segments()[0] & 0xFE00) == 0xFC00
        // Link-local (fe80::/10)
        || (ip.segments()[0] & 0xFFC0) == 0xFE80
        // Documentation (2001:db8::/32)
        || (ip.segments()[0] == 0x2001 && ip.segments()[1] == 0x0DB8)
}

fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_ipv4(v4),
        IpAddr::V6(v6) => is_internal_ipv6(v6),
    }
}

/// Exact host match or a subdomain of an allowed host.
fn is_domain_allowed(host: &str, allowed: &[&str]) -> bool {
    let host = host.to_lowercase();
    allowed
        .iter()
        .any(|a| host == *a || host.ends_with(&format!(".{}", a)))
}

/// Parse and check scheme and host, without touching DNS.
fn check_shape(url_str: &str, allowed: &[&str]) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str).map_err(|e| UrlValidationError::InvalidUrl(e.to_string()))?;

    if url.scheme() != "https" {
        return Err(UrlValidationError::NotHttps);
    }

    let host = url
        .host_str()
        .ok_or_else(|| UrlValidationError::InvalidUrl("No host in URL".to_string()))?;

    if !is_domain_allowed(host, allowed) {
        return Err(UrlValidationError::DomainNotAllowed(host.to_string()));
    }

    Ok(url)
}

fn validate_with(url_str: &str, allowed: &[&str]) -> Result<Url, UrlValidationError> {
    let url = check_shape(url_str, allowed)?;

    let host = url.host_str().unwrap_or_default();
    let socket_addr = format!("{}:{}", host, url.port().unwrap_or(443));
    let addrs = socket_addr
        .to_socket_addrs()
        .map_err(|e| UrlValidationError::DnsResolutionFailed(e.to_string()))?;

    for addr in addrs {
        if is_internal_ip(&addr.ip()) {
            return Err(UrlValidationError::InternalIpAddress(addr.ip().to_string()));
        }
    }

    Ok(url)
}

/// Validate a download-tracking reference before calling it with our API key.
pub fn validate_tracking_url(url_str: &str) -> Result<Url, UrlValidationError> {
    validate_with(url_str, TRACKING_DOMAINS)
}

/// Validate an image URL before fetching it to measure its dimensions.
pub fn validate_image_url(url_str: &str) -> Result<Url, UrlValidationError> {
    validate_with(url_str, IMAGE_DOMAINS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_domains() {
        assert!(is_domain_allowed("api.unsplash.com", TRACKING_DOMAINS));
        assert!(is_domain_allowed("API.Unsplash.com", TRACKING_DOMAINS));
        assert!(!is_domain_allowed("images.unsplash.com", TRACKING_DOMAINS));
        assert!(!is_domain_allowed("api.unsplash.com.evil.com", TRACKING_DOMAINS));
        assert!(is_domain_allowed("images.unsplash.com", IMAGE_DOMAINS));
        assert!(!is_domain_allowed("unsplash.com", IMAGE_DOMAINS));
    }

    #[test]
    fn test_internal_ips() {
        assert!(is_internal_ipv4(&Ipv4Addr::new(127, 0, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(192, 168, 1, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(169, 254, 1, 1)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(100, 64, 0, 1)));
        assert!(!is_internal_ipv4(&Ipv4Addr::new(8, 8, 8, 8)));

        assert!(is_internal_ipv6(&Ipv6Addr::LOCALHOST));
        assert!(is_internal_ipv6(&Ipv6Addr::UNSPECIFIED));
        assert!(is_internal_ipv6(&"fe80::1".parse().unwrap()));
    }

    #[test]
    fn test_reserved_ranges_are_internal() {
        assert!(is_internal_ipv4(&Ipv4Addr::new(192, 0, 2, 10)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(198, 51, 100, 7)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(203, 0, 113, 200)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(192, 0, 0, 8)));
        assert!(is_internal_ipv4(&Ipv4Addr::new(198, 19, 0, 1)));
        assert!(!is_internal_ipv4(&Ipv4Addr::new(192, 0, 3, 1)));
        assert!(!is_internal_ipv4(&Ipv4Addr::new(203, 0, 114, 1)));

        assert!(is_internal_ipv6(&"2001:db8::1".parse().unwrap()));
        assert!(is_internal_ip(&"::ffff:203.0.113.5".parse().unwrap()));
        assert!(!is_internal_ipv6(&"2001:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_rejects_http() {
        let result = validate_tracking_url("http://api.unsplash.com/photos/x/download");
        assert_eq!(result, Err(UrlValidationError::NotHttps));
    }

    #[test]
    fn test_rejects_unknown_domain() {
        let result = validate_tracking_url("https://evil.com/photos/x/download");
        assert!(matches!(result, Err(UrlValidationError::DomainNotAllowed(_))));

        let result = validate_image_url("https://api.unsplash.com/photos/x");
        assert!(matches!(result, Err(UrlValidationError::DomainNotAllowed(_))));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            validate_image_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_check_shape_accepts_cdn() {
        let url = check_shape("https://images.unsplash.com/photo-1?w=1080", IMAGE_DOMAINS).unwrap();
        assert_eq!(url.host_str(), Some("images.unsplash.com"));
    }
}
