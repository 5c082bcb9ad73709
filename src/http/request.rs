//! Request inspection for the authorization pipeline.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Derive the rate-limit client key
//! - Extract the bearer credential from `Authorization`
//! - Build the immutable `RequestContext`

use std::net::{IpAddr, SocketAddr};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::KeySource;
use crate::security::RequestContext;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Derive the rate-limit key for a request.
pub fn client_key(request: &Request<Body>, source: KeySource) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let forwarded = match source {
        KeySource::Peer => None,
        KeySource::ForwardedFor => forwarded_client(request.headers()),
    };

    match forwarded.or(peer) {
        Some(ip) => ip.to_string(),
        None => "unknown".to_string(),
    }
}

fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Extract the bearer credential.
///
/// No header or another scheme yields `None`. A `Bearer` header whose
/// value cannot be read yields an empty token, which the verifier
/// reports as malformed.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?;
    let Ok(value) = value.to_str() else {
        return Some(String::new());
    };

    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim().to_string())
    } else {
        None
    }
}

/// Build the pipeline context for a request.
pub fn request_context(request: &Request<Body>, source: KeySource) -> RequestContext {
    RequestContext::new(
        client_key(request, source),
        request.method().clone(),
        request.uri().path(),
        bearer_token(request.headers()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn request(headers: &[(&str, &[u8])]) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/artists/1?x=1");
        for (name, value) in headers {
            builder = builder.header(*name, HeaderValue::from_bytes(value).unwrap());
        }
        let mut req = builder.body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 0, 9], 51000))));
        req
    }

    #[test]
    fn test_bearer_extraction() {
        let h = |v: &[u8]| request(&[("authorization", v)]);

        assert_eq!(bearer_token(h(b"Bearer abc.def.ghi").headers()), Some("abc.def.ghi".into()));
        assert_eq!(bearer_token(h(b"bearer   abc ").headers()), Some("abc".into()));
        assert_eq!(bearer_token(h(b"Bearer").headers()), Some(String::new()));
        assert_eq!(bearer_token(h(b"Basic YWRtaW46YWRtaW4=").headers()), None);
        assert_eq!(bearer_token(h(b"Bearer \xff").headers()), Some(String::new()));
        assert_eq!(bearer_token(request(&[]).headers()), None);
    }

    #[test]
    fn test_client_key_from_peer() {
        let req = request(&[("x-forwarded-for", b"203.0.113.7")]);
        assert_eq!(client_key(&req, KeySource::Peer), "192.168.0.9");
    }

    #[test]
    fn test_client_key_from_forwarded_for() {
        let req = request(&[("x-forwarded-for", b"203.0.113.7, 10.0.0.1")]);
        assert_eq!(client_key(&req, KeySource::ForwardedFor), "203.0.113.7");

        let spoofed = request(&[("x-forwarded-for", b"not-an-ip")]);
        assert_eq!(client_key(&spoofed, KeySource::ForwardedFor), "192.168.0.9");
    }

    #[test]
    fn test_client_key_without_connect_info() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_key(&req, KeySource::Peer), "unknown");
    }

    #[test]
    fn test_request_context_uses_path_only() {
        let req = request(&[("authorization", b"Bearer t")]);
        let ctx = request_context(&req, KeySource::Peer);
        assert_eq!(ctx.path, "/api/artists/1");
        assert_eq!(ctx.method, Method::GET);
        assert_eq!(ctx.bearer.as_deref(), Some("t"));
        assert_eq!(ctx.identity, None);
    }
}
