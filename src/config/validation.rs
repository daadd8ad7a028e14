//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (counts >= 0, status codes, timeouts > 0)
//! - Check that addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::schema::{ResponseConfig, ServerConfig, TimeoutConfig};
use crate::simulation::CyclePlan;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be negative (got {value})")]
    NegativeCount { field: &'static str, value: i64 },

    #[error("{field} must not exceed {max} (got {value})")]
    CountTooLarge {
        field: &'static str,
        value: i64,
        max: u32,
    },

    #[error("{field} must be an HTTP status code between 100 and 599 (got {value})")]
    InvalidStatusCode { field: &'static str, value: u16 },

    #[error("{field} is not a valid socket address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("response.delay_ms ({delay_ms}) must be shorter than timeouts.request_secs ({request_secs}s)")]
    DelayExceedsTimeout { delay_ms: u64, request_secs: u64 },
}

/// Parse a configured status code, accepting only 100..=599.
pub fn parse_status_code(field: &'static str, value: u16) -> Result<StatusCode, ValidationError> {
    if !(100..=599).contains(&value) {
        return Err(ValidationError::InvalidStatusCode { field, value });
    }
    StatusCode::from_u16(value).map_err(|_| ValidationError::InvalidStatusCode { field, value })
}

/// The delay must leave room for the response before the request timeout.
pub fn check_delay_fits_timeout(
    response: &ResponseConfig,
    timeouts: &TimeoutConfig,
) -> Result<(), ValidationError> {
    if response.delay_ms >= timeouts.request_secs.saturating_mul(1000) {
        return Err(ValidationError::DelayExceedsTimeout {
            delay_ms: response.delay_ms,
            request_secs: timeouts.request_secs,
        });
    }
    Ok(())
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = parse_status_code("response.status_code", config.response.status_code) {
        errors.push(e);
    }

    // The cycle is validated even when disabled so a later toggle can't surprise anyone.
    if let Err(mut cycle_errors) = CyclePlan::validate(&config.failure) {
        errors.append(&mut cycle_errors);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    } else if let Err(e) = check_delay_fits_timeout(&config.response, &config.timeouts) {
        errors.push(e);
    }

    if config.response.max_body_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "response.max_body_bytes",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
