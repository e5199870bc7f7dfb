//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, CGI stderr lines)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - The generated request ID reaches scripts as `HTTP_X_REQUEST_ID`
//! - Metrics are cheap facade calls; without an exporter they are no-ops

pub mod logging;
pub mod metrics;
