//! Failure classification.
//!
//! Buckets failed request outcomes into a closed set of categories
//! consumed by the circuit breaker and the exposed metrics. The mapping
//! from an operation tag to a category is the single point where failure
//! semantics are normalized for the rest of the system.

use serde::{Deserialize, Serialize};

/// Categories of failed admissions and downstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rejected fast because the circuit was open.
    CircuitBreakerTrip,
    /// Rejected by the per-key quota check.
    RateLimitViolation,
    /// Downstream call exceeded its deadline.
    Timeout,
    /// Any other failure, including unrecognized tags.
    Failure,
}

impl ErrorCategory {
    /// Map an operation tag to its error bucket.
    ///
    /// Unrecognized tags fold into `Failure`.
    pub fn from_operation(operation: &str) -> Self {
        match operation {
            "circuit_breaker_trip" => ErrorCategory::CircuitBreakerTrip,
            "rate_limit_violation" => ErrorCategory::RateLimitViolation,
            "timeout" => ErrorCategory::Timeout,
            _ => ErrorCategory::Failure,
        }
    }

    /// Stable label used in metrics and wire responses.
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorCategory::CircuitBreakerTrip => "circuit_breaker_trip",
            ErrorCategory::RateLimitViolation => "rate_limit_violation",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Failure => "failure",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}
