//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request URL (path + query)
//!     → router.rs (ordered scan over compiled rules)
//!     → matcher.rs (regex search, capture groups)
//!     → Return: Dispatch::Script / Dispatch::StaticFile, or None
//!
//! Route Compilation (at startup and on reload):
//!     HandlerConfig[]
//!     → Compile patterns and templates
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled up front, immutable at runtime
//! - Deterministic: same URL always matches same rule
//! - First match wins (configured order)

use thiserror::Error;

pub mod matcher;
pub mod router;

pub use matcher::{RoutePattern, Template};
pub use router::{Dispatch, Route, RouteMatch, RouteTable, RouteTarget};

/// Errors raised while compiling handler rules.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid url pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "template `{template}` references group \\{group} but the pattern has {available} group(s)"
    )]
    UnknownCapture {
        template: String,
        group: String,
        available: usize,
    },

    #[error("handler `{0}` has neither `script` nor `static_files`")]
    MissingTarget(String),

    #[error("handler `{0}` sets both `script` and `static_files`")]
    ConflictingTargets(String),
}
