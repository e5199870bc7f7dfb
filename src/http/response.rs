//! Response construction.
//!
//! # Responsibilities
//! - Translate a parsed CGI response into an HTTP response
//! - Map per-request failures to short plain-text error responses
//!
//! # Design Decisions
//! - CGI reason phrases are kept on the status line when they differ from
//!   the canonical one
//! - Header names are sent lower-cased by the HTTP/1 encoder; values and
//!   duplicates are kept as the script wrote them

use axum::{
    body::Body,
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::ext::ReasonPhrase;

use crate::cgi::{CgiResponse, GatewayError};

impl IntoResponse for CgiResponse {
    fn into_response(self) -> Response {
        let CgiResponse { head, body } = self;
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = head.status;

        let canonical = head.status.canonical_reason().unwrap_or_default();
        if !head.status_message.is_empty() && head.status_message != canonical {
            match ReasonPhrase::try_from(head.status_message.into_bytes()) {
                Ok(reason) => {
                    response.extensions_mut().insert(reason);
                }
                Err(_) => tracing::debug!("Dropping CGI reason phrase with invalid bytes"),
            }
        }

        let headers = response.headers_mut();
        for (name, value) in head.headers {
            match HeaderName::from_bytes(name.as_bytes()) {
                Ok(header_name) => {
                    headers.append(header_name, value);
                }
                Err(_) => tracing::debug!(header = %name, "Dropping invalid CGI header"),
            }
        }

        response
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match status {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::BAD_GATEWAY => "Bad Gateway",
            StatusCode::GATEWAY_TIMEOUT => "Gateway Timeout",
            _ => "Internal Server Error",
        };
        (status, message).into_response()
    }
}

/// The 404 returned for unmatched routes and missing static files.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgi::{ParseError, ResponseHead};
    use axum::http::{header, HeaderValue};

    fn cgi(
        status: StatusCode,
        message: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> CgiResponse {
        CgiResponse {
            head: ResponseHead {
                status,
                status_message: message.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), HeaderValue::from_str(v).unwrap()))
                    .collect(),
            },
            body: body.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_cgi_response_translation() {
        let response = cgi(
            StatusCode::CREATED,
            "Created",
            &[("X-Foo", "bar"), ("Set-Cookie", "a=1"), ("Set-Cookie", "b=2")],
            b"HELLO",
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.extensions().get::<ReasonPhrase>().is_none());
        assert_eq!(response.headers()["x-foo"], "bar");
        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"HELLO");
    }

    #[test]
    fn test_custom_reason_phrase() {
        let response = cgi(StatusCode::OK, "All Good", &[], b"").into_response();
        let reason = response.extensions().get::<ReasonPhrase>().unwrap();
        assert_eq!(reason.as_bytes(), b"All Good");

        let empty = cgi(StatusCode::FOUND, "", &[], b"").into_response();
        assert!(empty.extensions().get::<ReasonPhrase>().is_none());
    }

    #[test]
    fn test_gateway_error_responses() {
        let spawn = GatewayError::Spawn {
            program: "/missing".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(spawn.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let invalid = GatewayError::InvalidOutput(ParseError::InvalidStatus("x".into()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
