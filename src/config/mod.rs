//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags / environment (cli.rs)
//! config file (TOML)
//!     → loader.rs (parse & deserialize, merge overrides, resolve approot)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!
//! On file change (watch enabled):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates handlers
//!     → compiled RouteTable sent to the server for an atomic swap
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the handler list is reloadable
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use cli::Cli;
pub use loader::{load_config, ConfigError, Settings};
pub use schema::{AppConfig, CgiConfig, HandlerConfig, ObservabilityConfig, ServerConfig};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
