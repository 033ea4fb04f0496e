//! Request inspection.
//!
//! # Responsibilities
//! - Derive the client identifier used as the rate limit key
//!
//! # Design Decisions
//! - The first `X-Forwarded-For` hop wins, then the socket peer address
//! - A missing identifier falls back to the literal `"unknown"`, so such
//!   clients share one quota instead of bypassing the limiter
//! - The identifier is not authenticated; it is only a rate limit key

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};

/// Header carrying the original client address behind a proxy.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Identifier used when neither a forwarded address nor a peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client identifier extracted from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    /// Resolve the identifier from request headers and the peer address.
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());

        match (forwarded, peer) {
            (Some(hop), _) => ClientId(hop.to_string()),
            (None, Some(addr)) => ClientId(addr.ip().to_string()),
            (None, None) => ClientId(UNKNOWN_CLIENT.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientId::resolve(&parts.headers, peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:54321".parse().unwrap())
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(" 1.2.3.4 , 10.0.0.1"));
        assert_eq!(ClientId::resolve(&headers, peer()), ClientId("1.2.3.4".into()));
    }

    #[test]
    fn test_peer_address_fallback() {
        let headers = HeaderMap::new();
        assert_eq!(ClientId::resolve(&headers, peer()).as_str(), "10.0.0.7");

        let mut blank = HeaderMap::new();
        blank.insert(X_FORWARDED_FOR, HeaderValue::from_static(" , 1.2.3.4"));
        assert_eq!(ClientId::resolve(&blank, peer()).as_str(), "10.0.0.7");
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(ClientId::resolve(&HeaderMap::new(), None).as_str(), UNKNOWN_CLIENT);
    }
}
