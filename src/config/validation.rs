//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, worker count > 0)
//! - Check addresses parse and histogram buckets are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MonitorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::MonitorConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is not a valid socket address: {value}")]
    BadAddress { field: &'static str, value: String },

    #[error("workers.base_delay_ms ({base}) exceeds workers.max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("observability.latency_buckets must be finite and strictly increasing")]
    BucketOrder,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.source.root_dir.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "source.root_dir" });
    }
    if config.source.resync_secs == 0 {
        errors.push(ValidationError::Zero { field: "source.resync_secs" });
    }
    if config.source.fetch_timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "source.fetch_timeout_ms" });
    }
    if config.workers.count == 0 {
        errors.push(ValidationError::Zero { field: "workers.count" });
    }
    if config.workers.base_delay_ms > config.workers.max_delay_ms {
        errors.push(ValidationError::BackoffRange {
            base: config.workers.base_delay_ms,
            max: config.workers.max_delay_ms,
        });
    }

    let obs = &config.observability;
    if obs.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &obs.metrics_address);
        let buckets = &obs.latency_buckets;
        if buckets.is_empty() {
            errors.push(ValidationError::Empty { field: "observability.latency_buckets" });
        } else if buckets.iter().any(|b| !b.is_finite()) || buckets.windows(2).any(|w| w[0] >= w[1]) {
            errors.push(ValidationError::BucketOrder);
        }
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field,
            value: value.to_string(),
        });
    }
}
