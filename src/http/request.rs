//! Request metadata extraction.
//!
//! # Responsibilities
//! - Capture everything the CGI environment needs from an inbound request
//! - Keep the raw URL (path + query) used for route matching
//!
//! # Design Decisions
//! - One context per request, owned by its handler; never shared
//! - The body is not part of the context and is streamed separately

use std::net::SocketAddr;

use axum::http::{header, request::Parts, HeaderMap, Method};

/// Per-request metadata consumed by routing and the CGI gateway.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Path and query as received, e.g. `/item/42?full=1`.
    pub raw_url: String,
    pub pathname: String,
    pub query_string: Option<String>,
    /// Host header, or the URI authority when the header is absent.
    pub host: Option<String>,
    pub headers: HeaderMap,
    pub remote_addr: SocketAddr,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts, remote_addr: SocketAddr) -> Self {
        let uri = &parts.uri;
        let raw_url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.as_str().to_string()));

        Self {
            method: parts.method.clone(),
            raw_url,
            pathname: uri.path().to_string(),
            query_string: uri.query().map(str::to_string),
            host,
            headers: parts.headers.clone(),
            remote_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(req: Request<()>) -> Parts {
        req.into_parts().0
    }

    #[test]
    fn test_url_pieces() {
        let req = Request::builder()
            .method("POST")
            .uri("/form/submit?a=1&b=2")
            .header("Host", "example.test:8000")
            .body(())
            .unwrap();
        let ctx = RequestContext::from_parts(&parts(req), "10.0.0.7:5555".parse().unwrap());

        assert_eq!(ctx.method, Method::POST);
        assert_eq!(ctx.raw_url, "/form/submit?a=1&b=2");
        assert_eq!(ctx.pathname, "/form/submit");
        assert_eq!(ctx.query_string.as_deref(), Some("a=1&b=2"));
        assert_eq!(ctx.host.as_deref(), Some("example.test:8000"));
        assert_eq!(ctx.remote_addr.port(), 5555);
    }

    #[test]
    fn test_host_falls_back_to_authority() {
        let req = Request::builder().uri("http://origin.test:81/x").body(()).unwrap();
        let ctx = RequestContext::from_parts(&parts(req), "127.0.0.1:1".parse().unwrap());
        assert_eq!(ctx.host.as_deref(), Some("origin.test:81"));
        assert_eq!(ctx.raw_url, "/x");
        assert!(ctx.query_string.is_none());
    }
}
