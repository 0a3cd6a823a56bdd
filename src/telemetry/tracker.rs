//! Rolling-window latency and throughput tracking.
//!
//! # Responsibilities
//! - Record per-request latency samples into a bounded buffer
//! - Compute percentile/min/max/avg statistics on demand
//! - Track request rate since the start of the measurement window
//! - Count failures per error category
//!
//! # Design Decisions
//! - Percentiles use exact-rank indexing (sort ascending, index
//!   `floor(count * pct / 100)` clamped to `count - 1`), no interpolation
//! - On buffer overflow the oldest half is discarded: recent-window
//!   percentile correctness is favored over exact history
//! - The throughput window never rolls implicitly; only an explicit
//!   `reset()` starts a new measurement baseline

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

use crate::observability::metrics;
use crate::telemetry::classifier::ErrorCategory;

/// One completed request observation.
#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

/// Opaque handle returned by `start_timer`, consumed by `record_latency`.
#[derive(Debug)]
pub struct TimerToken {
    operation: String,
    started_at: Instant,
}

impl TimerToken {
    /// Operation tag the timer was started with.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Elapsed time since the timer was started.
    pub fn elapsed_ms(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64() * 1000.0
    }
}

/// Latency distribution over the current sample window.
#[derive(Debug, Clone, Serialize, Default)]
pub struct LatencyStats {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub count: usize,
}

/// Request rate since the window started.
#[derive(Debug, Clone, Serialize, Default)]
pub struct Throughput {
    pub rps: f64,
    pub rpm: f64,
    pub total_requests: u64,
    pub window_secs: f64,
}

/// Failure counts per category since the window started.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ErrorCounts {
    pub circuit_breaker_trips: u64,
    pub rate_limit_violations: u64,
    pub timeouts: u64,
    pub failures: u64,
}

/// Point-in-time view of gateway performance.
///
/// Always derived from the live window; never stored as state.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PerformanceSnapshot {
    pub latency: LatencyStats,
    pub throughput: Throughput,
    pub errors: ErrorCounts,
}

struct TrackerState {
    samples: Vec<LatencySample>,
    total_requests: u64,
    error_counts: HashMap<ErrorCategory, u64>,
    window_started: Instant,
}

/// Rolling-window performance tracker.
pub struct LatencyTracker {
    state: Mutex<TrackerState>,
    sample_capacity: usize,
}

impl LatencyTracker {
    /// Create a tracker with the given sample buffer capacity.
    ///
    /// Capacity below 2 is raised to 2 so compaction always makes progress.
    pub fn new(sample_capacity: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                samples: Vec::new(),
                total_requests: 0,
                error_counts: HashMap::new(),
                window_started: Instant::now(),
            }),
            sample_capacity: sample_capacity.max(2),
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&self, operation: &str) -> TimerToken {
        TimerToken {
            operation: operation.to_string(),
            started_at: Instant::now(),
        }
    }

    /// Record a completed operation.
    ///
    /// The `operation` tag may differ from the one the timer was started
    /// with: on failure it selects the error bucket (unrecognized tags
    /// fold into `failure`).
    pub fn record_latency(&self, token: TimerToken, operation: &str, success: bool) {
        let duration_ms = token.elapsed_ms();

        let mut state = self.state.lock().expect("tracker mutex poisoned");
        state.total_requests += 1;

        if state.samples.len() >= self.sample_capacity {
            // Keep the most recent half.
            let dropped = state.samples.len() / 2;
            state.samples.drain(..dropped);
            tracing::debug!(dropped, "Sample buffer compacted");
        }
        state.samples.push(LatencySample {
            duration_ms,
            success,
        });

        if !success {
            let category = ErrorCategory::from_operation(operation);
            *state.error_counts.entry(category).or_insert(0) += 1;
            metrics::record_error(category.as_label());
        }
        drop(state);

        metrics::record_operation(token.operation(), success, duration_ms);
    }

    /// Compute a snapshot from the live window.
    pub fn snapshot(&self) -> PerformanceSnapshot {
        let state = self.state.lock().expect("tracker mutex poisoned");

        let mut durations: Vec<f64> = state.samples.iter().map(|s| s.duration_ms).collect();
        durations.sort_by(|a, b| a.partial_cmp(b).expect("latency is never NaN"));

        let latency = if durations.is_empty() {
            LatencyStats::default()
        } else {
            let count = durations.len();
            let sum: f64 = durations.iter().sum();
            LatencyStats {
                p50: durations[percentile_index(count, 50)],
                p90: durations[percentile_index(count, 90)],
                p95: durations[percentile_index(count, 95)],
                p99: durations[percentile_index(count, 99)],
                min: durations[0],
                max: durations[count - 1],
                avg: sum / count as f64,
                count,
            }
        };

        let window_secs = state.window_started.elapsed().as_secs_f64();
        // Guard against a zero-length window right after construction/reset.
        let effective = window_secs.max(f64::EPSILON);
        let rps = state.total_requests as f64 / effective;

        let errors = ErrorCounts {
            circuit_breaker_trips: count_for(&state.error_counts, ErrorCategory::CircuitBreakerTrip),
            rate_limit_violations: count_for(&state.error_counts, ErrorCategory::RateLimitViolation),
            timeouts: count_for(&state.error_counts, ErrorCategory::Timeout),
            failures: count_for(&state.error_counts, ErrorCategory::Failure),
        };

        PerformanceSnapshot {
            latency,
            throughput: Throughput {
                rps,
                rpm: rps * 60.0,
                total_requests: state.total_requests,
                window_secs,
            },
            errors,
        }
    }

    /// Discard all samples and counters and start a new window.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("tracker mutex poisoned");
        state.samples.clear();
        state.total_requests = 0;
        state.error_counts.clear();
        state.window_started = Instant::now();
        tracing::info!("Performance window reset");
    }
}

/// Exact-rank percentile index: `floor(count * pct / 100)`, clamped.
fn percentile_index(count: usize, pct: usize) -> usize {
    (count * pct / 100).min(count - 1)
}

fn count_for(counts: &HashMap<ErrorCategory, u64>, category: ErrorCategory) -> u64 {
    counts.get(&category).copied().unwrap_or(0)
}
