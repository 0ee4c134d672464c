//! Client address extraction shared by the request logger and rate limiter.
//!
//! # Resolution Order
//!
//! 1. First entry of `X-Forwarded-For` (set by a reverse proxy)
//! 2. Transport peer address from Axum's `ConnectInfo<SocketAddr>` extension
//! 3. [`UNKNOWN_IP`]
//!
//! The peer address is only available when the server is started with
//! `into_make_service_with_connect_info::<SocketAddr>()`.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! `X-Forwarded-For` is client-controlled unless a trusted proxy overwrites
//! it. Deploy behind a proxy that sets the header and block direct access,
//! otherwise clients can rotate spoofed addresses to dodge per-IP limits:
//!
//! ```nginx
//! proxy_set_header X-Forwarded-For $remote_addr;
//! ```
//!
//! ## The "unknown" Fallback
//!
//! Requests with neither header nor peer address share the `"unknown"` key and
//! are therefore rate-limited collectively.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;

/// Fallback address when no client address can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Header carrying the proxy chain, client first.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Where the client address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractedIp<'a> {
    /// First entry of X-Forwarded-For.
    FromXff(&'a str),
    /// Transport-layer peer.
    FromPeer(SocketAddr),
    NotFound,
}

#[inline]
fn extract_ip<B>(req: &Request<B>) -> ExtractedIp<'_> {
    // Format: "client, proxy1, proxy2" - we want the first (client) entry.
    // An empty first entry is treated as if the header were absent.
    if let Some(forwarded) = req.headers().get(FORWARDED_FOR_HEADER)
        && let Ok(value) = forwarded.to_str()
        && let Some(first_ip) = value.split(',').next().map(str::trim)
        && !first_ip.is_empty()
    {
        return ExtractedIp::FromXff(first_ip);
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return ExtractedIp::FromPeer(*addr);
    }

    ExtractedIp::NotFound
}

/// Extract the client address for a request.
///
/// Returns `Cow::Borrowed` for the [`UNKNOWN_IP`] fallback and an owned string
/// otherwise; call `.into_owned()` when it must outlive the request.
///
/// Only the IP of a peer address is used, so a client reconnecting from a
/// new ephemeral port keeps the same key.
#[inline]
pub fn extract_client_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    match extract_ip(req) {
        ExtractedIp::FromXff(ip) => Cow::Owned(ip.to_string()),
        ExtractedIp::FromPeer(addr) => Cow::Owned(addr.ip().to_string()),
        ExtractedIp::NotFound => Cow::Borrowed(UNKNOWN_IP),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn with_peer(builder: axum::http::request::Builder, peer: &str) -> Request<Body> {
        let mut req = builder.body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        req
    }

    #[test]
    fn test_extract_ip_from_xff() {
        let req = Request::builder()
            .header("x-forwarded-for", "192.168.1.1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "192.168.1.1");
    }

    #[test]
    fn test_extract_ip_with_whitespace() {
        let req = Request::builder()
            .header("x-forwarded-for", "  192.168.1.1  , 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "192.168.1.1");
    }

    #[test]
    fn test_xff_takes_priority_over_peer() {
        let req = with_peer(
            Request::builder().header("x-forwarded-for", "203.0.113.50"),
            "10.0.0.7:51000",
        );

        assert_eq!(extract_client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_peer_address_used_without_xff() {
        let req = with_peer(Request::builder(), "10.0.0.7:51000");

        assert_eq!(extract_client_ip(&req), "10.0.0.7");
    }

    #[test]
    fn test_peer_port_is_ignored() {
        let a = with_peer(Request::builder(), "10.0.0.7:51000");
        let b = with_peer(Request::builder(), "10.0.0.7:51001");

        assert_eq!(extract_client_ip(&a), extract_client_ip(&b));
    }

    #[test]
    fn test_peer_ipv6() {
        let req = with_peer(Request::builder(), "[::1]:8000");

        assert_eq!(extract_client_ip(&req), "::1");
    }

    #[test]
    fn test_empty_xff_falls_back_to_peer() {
        let req = with_peer(
            Request::builder().header("x-forwarded-for", "  "),
            "10.0.0.7:51000",
        );

        assert_eq!(extract_client_ip(&req), "10.0.0.7");
    }

    #[test]
    fn test_extract_ip_unknown_is_borrowed() {
        let req = Request::builder().body(Body::empty()).unwrap();

        let ip = extract_client_ip(&req);
        assert_eq!(ip, "unknown");
        assert!(matches!(ip, Cow::Borrowed(_)));
    }

    #[test]
    fn test_extract_ip_long_proxy_chain() {
        let long_chain = (0..100)
            .map(|i| format!("10.0.0.{}", i % 256))
            .collect::<Vec<_>>()
            .join(", ");

        let req = Request::builder()
            .header("x-forwarded-for", &long_chain)
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "10.0.0.0");
    }

    #[test]
    fn test_extract_ip_xff_with_ipv6() {
        let req = Request::builder()
            .header("x-forwarded-for", "2001:db8::1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "2001:db8::1");
    }
}
