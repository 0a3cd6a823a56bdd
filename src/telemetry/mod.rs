//! Telemetry subsystem.
//!
//! # Data Flow
//! ```text
//! Admission façade completes a request:
//!     → tracker.rs (append latency sample, bump throughput counters)
//!     → classifier.rs (failed outcomes bucketed by category)
//!
//! On demand:
//!     tracker.snapshot() → PerformanceSnapshot (percentiles, rates, errors)
//!     → /v1/metrics/performance and breaker decisions
//! ```
//!
//! # Design Decisions
//! - Snapshot is always recomputed from the live window, never cached
//! - Sample buffer is bounded; overflow discards the oldest half
//! - Error semantics are normalized in exactly one place (classifier)

pub mod classifier;
pub mod tracker;

pub use classifier::ErrorCategory;
pub use tracker::{LatencyTracker, PerformanceSnapshot, TimerToken};
