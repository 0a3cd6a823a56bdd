//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds, timeouts, capacities)
//! - Check addresses parse before any listener binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<_>>
//! - Runs before the config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(err(
            "listener.bind_address",
            "must be a valid socket address",
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(err(
            "observability.metrics_address",
            "must be a valid socket address",
        ));
    }

    if config.listener.request_timeout_secs == 0 {
        errors.push(err("listener.request_timeout_secs", "must be at least 1"));
    }

    if config.downstream.resource.is_empty() {
        errors.push(err("downstream.resource", "must not be empty"));
    }
    if config.downstream.timeout_secs == 0 {
        errors.push(err("downstream.timeout_secs", "must be at least 1"));
    }

    if config.tracker.sample_capacity < 2 {
        errors.push(err("tracker.sample_capacity", "must be at least 2"));
    }

    let breaker = &config.circuit_breaker;
    if breaker.enabled {
        // A single isolated failure must never trip the circuit.
        if breaker.failure_threshold < 2 {
            errors.push(err("circuit_breaker.failure_threshold", "must be at least 2"));
        }
        if breaker.reset_timeout_secs == 0 {
            errors.push(err("circuit_breaker.reset_timeout_secs", "must be at least 1"));
        }
        if breaker.max_reset_timeout_secs < breaker.reset_timeout_secs {
            errors.push(err(
                "circuit_breaker.max_reset_timeout_secs",
                "must be >= reset_timeout_secs",
            ));
        }
        if breaker.half_open_max_probes == 0 {
            errors.push(err("circuit_breaker.half_open_max_probes", "must be at least 1"));
        }
    }

    let rate = &config.rate_limit;
    if rate.enabled {
        if rate.requests_per_window == 0 {
            errors.push(err("rate_limit.requests_per_window", "must be at least 1"));
        }
        if rate.window_secs == 0 {
            errors.push(err("rate_limit.window_secs", "must be at least 1"));
        }
    }

    if config.session.max_ttl_secs == 0 {
        errors.push(err("session.max_ttl_secs", "must be at least 1"));
    }
    if config.session.correlation_capacity == 0 {
        errors.push(err("session.correlation_capacity", "must be at least 1"));
    }

    if config.persistence.enabled && config.persistence.path.is_empty() {
        errors.push(err("persistence.path", "must not be empty when enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
