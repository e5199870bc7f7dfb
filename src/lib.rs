//! Development HTTP server that dispatches requests to CGI scripts or static
//! files through ordered URL pattern rules.

pub mod cgi;
pub mod config;
pub mod http;
pub mod observability;
pub mod routing;

pub use config::Settings;
pub use http::HttpServer;
