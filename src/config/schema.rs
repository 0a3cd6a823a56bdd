//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! admission gateway. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the admission gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Downstream processing stage settings.
    pub downstream: DownstreamConfig,

    /// Latency/throughput tracker settings.
    pub tracker: TrackerConfig,

    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Session and device policy.
    pub session: SessionConfig,

    /// State snapshot persistence.
    pub persistence: PersistenceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Downstream processing stage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Name of the protected resource; scopes the default circuit.
    pub resource: String,

    /// Deadline for a downstream call in seconds. Expiry is recorded as
    /// a `timeout` failure and feeds the breaker.
    pub timeout_secs: u64,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            resource: "processing".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Latency/throughput tracker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Sample buffer capacity; overflow discards the oldest half.
    pub sample_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sample_capacity: 10_000,
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Enable the breaker.
    pub enabled: bool,

    /// Failures within the window before the circuit opens.
    pub failure_threshold: u32,

    /// Sliding window for counting failures, in seconds.
    pub failure_window_secs: u64,

    /// Base time an open circuit holds before probing, in seconds.
    pub reset_timeout_secs: u64,

    /// Cap for the backed-off reopen timeout, in seconds.
    pub max_reset_timeout_secs: u64,

    /// Trial requests admitted per half-open period.
    pub half_open_max_probes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            failure_window_secs: 60,
            reset_timeout_secs: 60,
            max_reset_timeout_secs: 600,
            half_open_max_probes: 3,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests admitted per key per window.
    pub requests_per_window: u32,

    /// Fixed window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 100,
            window_secs: 60,
        }
    }
}

/// Session and device policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Longest ttl a caller may request, in seconds.
    pub max_ttl_secs: u64,

    /// Correlation records kept before the oldest are dropped.
    pub correlation_capacity: usize,

    /// Correlation retention in seconds.
    pub correlation_retention_secs: u64,

    /// Window feeding per-owner usage-pattern risk, in seconds.
    pub usage_window_secs: u64,

    /// Interval between background prunes of terminated sessions.
    pub prune_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_ttl_secs: 86_400,
            correlation_capacity: 10_000,
            correlation_retention_secs: 86_400,
            usage_window_secs: 3_600,
            prune_interval_secs: 300,
        }
    }
}

/// State snapshot persistence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Persist devices, sessions, and the correlation set on shutdown.
    pub enabled: bool,

    /// Snapshot file path.
    pub path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "gateway_state.json".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
