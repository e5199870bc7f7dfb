//! Static file responses.

use std::path::Path;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::response::not_found;

/// Serve `path`, or 404 when it cannot be read.
pub async fn serve_file(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(data) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (StatusCode::OK, [(header::CONTENT_TYPE, mime.to_string())], data).into_response()
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Static file not readable");
            not_found()
        }
    }
}
