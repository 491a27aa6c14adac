//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (delays > 0, keep-alive > 0)
//! - Check the listen address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.listener.address.is_empty() && config.listener.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.address",
            format!("'{}' is not a socket address", config.listener.address),
        ));
    }

    if config.listener.keepalive_secs == 0 {
        errors.push(ValidationError::new("listener.keepalive_secs", "must be greater than 0"));
    }

    if config.backoff.initial_delay_ms == 0 {
        errors.push(ValidationError::new("backoff.initial_delay_ms", "must be greater than 0"));
    }

    if config.backoff.max_delay_ms < config.backoff.initial_delay_ms {
        errors.push(ValidationError::new(
            "backoff.max_delay_ms",
            "must not be smaller than backoff.initial_delay_ms",
        ));
    }

    if config.observability.log_level.trim().is_empty() {
        errors.push(ValidationError::new("observability.log_level", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
