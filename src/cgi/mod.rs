//! CGI gateway subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext + resolved script path
//!     → env.rs (fresh CGI/1.1 environment over the inherited snapshot)
//!     → gateway.rs (spawn interpreter, stream stdin, drain stderr, read stdout)
//!     → parser.rs (Status pseudo-header, headers, body)
//!     → CgiResponse → HTTP response
//! ```
//!
//! # Design Decisions
//! - Nothing request-specific is ever written to shared state
//! - Parser and subprocess handles are owned by the request that created them
//! - Malformed script output degrades to a plain 200 body, never a crash

pub mod env;
pub mod gateway;
pub mod parser;

pub use env::{CgiEnvironment, EnvironmentBuilder, InheritedEnv};
pub use gateway::{CgiGateway, GatewayConfig, GatewayError};
pub use parser::{CgiResponse, ParseError, ResponseHead, ResponseParser};
