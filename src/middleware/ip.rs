//! Client IP resolution shared by the rate limiting and auth middleware.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! These functions trust client-provided proxy headers. When this service
//! is reachable directly from the internet, a client can rotate spoofed
//! `X-Forwarded-For` values to dodge per-IP rate limiting or frame other
//! addresses. Deploy behind a reverse proxy that overwrites (not appends
//! to) these headers, and block direct access.
//!
//! # The Loopback Fallback
//!
//! When no header or socket address yields an IP, all such requests share
//! the loopback key. They are collectively rate-limited, which may
//! throttle legitimate clients behind a misconfigured proxy; watch for
//! high loopback traffic in logs.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;

/// Shared limiter key for requests whose client IP cannot be determined.
pub const FALLBACK_CLIENT_IP: &str = "127.0.0.1";

/// Resolve the client IP for a request.
///
/// Resolution order, first match wins:
/// 1. `X-Forwarded-For` - first entry of the comma-separated list, which
///    is the original client when the edge proxy sets the header
/// 2. `X-Real-IP`
/// 3. The peer socket address, when the server was started with
///    `into_make_service_with_connect_info`
/// 4. [`FALLBACK_CLIENT_IP`]
///
/// Returns `Cow<'static, str>` so the fallback costs no allocation; call
/// `.into_owned()` when the value must outlive the request.
#[inline]
pub fn resolve_client_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return Cow::Owned(first.to_string());
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        let value = value.trim();
        if !value.is_empty() {
            return Cow::Owned(value.to_string());
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Cow::Owned(addr.ip().to_string());
    }

    Cow::Borrowed(FALLBACK_CLIENT_IP)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request() -> axum::http::request::Builder {
        Request::builder()
    }

    #[test]
    fn test_xff_first_entry_wins() {
        let req = request()
            .header("x-forwarded-for", "203.0.113.50, 10.0.0.1, 10.0.0.2")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_xff_trims_whitespace() {
        let req = request()
            .header("x-forwarded-for", "  198.51.100.7  , 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), "198.51.100.7");
    }

    #[test]
    fn test_xff_priority_over_real_ip() {
        let req = request()
            .header("x-forwarded-for", "203.0.113.50")
            .header("x-real-ip", "198.51.100.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_real_ip_fallback() {
        let req = request()
            .header("x-real-ip", "198.51.100.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), "198.51.100.7");
    }

    #[test]
    fn test_empty_xff_falls_through() {
        let req = request()
            .header("x-forwarded-for", "   ")
            .header("x-real-ip", "198.51.100.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), "198.51.100.7");
    }

    #[test]
    fn test_connect_info_fallback() {
        let mut req = request().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("192.0.2.9:51234".parse().unwrap()));

        assert_eq!(resolve_client_ip(&req), "192.0.2.9");
    }

    #[test]
    fn test_loopback_fallback_is_borrowed() {
        let req = request().body(Body::empty()).unwrap();

        let ip = resolve_client_ip(&req);
        assert_eq!(ip, FALLBACK_CLIENT_IP);
        assert!(matches!(ip, Cow::Borrowed(_)));
    }

    #[test]
    fn test_ipv6_client() {
        let req = request()
            .header("x-forwarded-for", "2001:db8::1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), "2001:db8::1");
    }
}
