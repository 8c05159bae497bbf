//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the web root exists before the site is compiled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SpaConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::SpaConfig;

/// Smallest header limit that still admits ordinary browser requests.
pub const MIN_HEADER_BYTES: usize = 8 * 1024;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `timeouts.idle_secs`.
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

impl std::error::Error for ValidationError {}

/// Check every semantic constraint, collecting all failures.
pub fn validate_config(config: &SpaConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new(
            "listener.max_connections",
            "must be greater than zero",
        ));
    }

    if !config.site.web_root.is_dir() {
        errors.push(ValidationError::new(
            "site.web_root",
            format!("{} is not a directory", config.site.web_root.display()),
        ));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.idle_secs", timeouts.idle_secs),
        ("timeouts.read_secs", timeouts.read_secs),
        ("timeouts.read_header_secs", timeouts.read_header_secs),
        ("timeouts.write_secs", timeouts.write_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }
    if timeouts.max_header_bytes < MIN_HEADER_BYTES {
        errors.push(ValidationError::new(
            "timeouts.max_header_bytes",
            format!("must be at least {MIN_HEADER_BYTES}"),
        ));
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be set when the admin listener is enabled",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if let Err(e) = value.parse::<SocketAddr>() {
        errors.push(ValidationError::new(field, format!("invalid address {value:?}: {e}")));
    }
}
