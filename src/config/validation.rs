//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every handler pattern and template
//! - Check that script handlers have an interpreter to run
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::IpAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::routing::{Route, RouteError};

/// A single semantic problem in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.bind_address `{0}` is not an IP address")]
    InvalidBindAddress(String),

    #[error("handlers[{index}]: {source}")]
    Handler {
        index: usize,
        #[source]
        source: RouteError,
    },

    #[error("script handlers are configured but no CGI binary is set (use --cgi or cgi.binary)")]
    MissingInterpreter,

    #[error("cgi.timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.server.bind_address.clone()));
    }

    if config.cgi.timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    errors.extend(validate_handlers(config, config.cgi.binary.is_some()));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate only the handler list; used on hot reload, where the interpreter
/// is fixed for the process lifetime.
pub fn validate_handlers(config: &AppConfig, has_interpreter: bool) -> Vec<ValidationError> {
    let mut errors: Vec<ValidationError> = config
        .handlers
        .iter()
        .enumerate()
        .filter_map(|(index, handler)| {
            Route::compile(handler)
                .err()
                .map(|source| ValidationError::Handler { index, source })
        })
        .collect();

    if config.has_script_handlers() && !has_interpreter {
        errors.push(ValidationError::MissingInterpreter);
    }

    errors
}
