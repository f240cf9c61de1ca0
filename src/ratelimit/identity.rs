//! Client identity derivation.
//!
//! Order of precedence, first non-empty wins:
//! 1. `X-Real-Ip`, normally set by the edge proxy
//! 2. `X-Forwarded-For`, first hop
//! 3. the peer address of the connection
//!
//! Both headers are supplied by the client unless the deployment strips and
//! rewrites them at a trusted edge. A directly exposed service should turn
//! `trust_proxy_headers` off, otherwise any client can pick its own identity.

use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const REAL_IP_HEADER: &str = "x-real-ip";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Identity used when neither headers nor a peer address are available.
const UNKNOWN_CLIENT: &str = "unknown";

/// Derives the rate-limit identity for a request.
///
/// The peer address contributes its IP only; ports change per connection.
pub fn client_identity(
    headers: &HeaderMap,
    remote: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        if let Some(ip) = header_value(headers, REAL_IP_HEADER) {
            return ip.to_string();
        }
        if let Some(hop) = header_value(headers, FORWARDED_FOR_HEADER)
            .and_then(|value| value.split(',').map(str::trim).find(|hop| !hop.is_empty()))
        {
            return hop.to_string();
        }
    }

    remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.10:51234".parse().unwrap())
    }

    #[test]
    fn test_real_ip_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(REAL_IP_HEADER, HeaderValue::from_static("203.0.113.5"));
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static("198.51.100.1"));

        assert_eq!(client_identity(&headers, peer(), true), "203.0.113.5");
    }

    #[test]
    fn test_forwarded_for_uses_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static(" 198.51.100.1 , 10.0.0.1"),
        );

        assert_eq!(client_identity(&headers, peer(), true), "198.51.100.1");
    }

    #[test]
    fn test_empty_headers_fall_through_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert(REAL_IP_HEADER, HeaderValue::from_static("  "));
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static(""));

        assert_eq!(client_identity(&headers, peer(), true), "192.0.2.10");
    }

    #[test]
    fn test_untrusted_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(REAL_IP_HEADER, HeaderValue::from_static("203.0.113.5"));

        assert_eq!(client_identity(&headers, peer(), false), "192.0.2.10");
    }

    #[test]
    fn test_no_source_is_unknown() {
        assert_eq!(client_identity(&HeaderMap::new(), None, true), "unknown");
    }
}
