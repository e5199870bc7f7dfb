//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum::serve)
//!     → server.rs (middleware, catch-all dispatch)
//!     → request.rs (RequestContext: URL pieces, headers, peer address)
//!     → routing (first matching rule)
//!     → cgi gateway | static_files.rs | 404
//!     → response.rs (CGI head → status line + headers, error mapping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod static_files;

pub use request::RequestContext;
pub use server::{AppState, HttpServer};
