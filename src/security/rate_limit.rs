//! Per-identity rate limiting.
//!
//! Fixed-window counters, chosen over token/leaky buckets for
//! auditability: window boundaries are deterministic, so downstream
//! accounting can reproduce exactly which requests fell into which
//! window. The cost is boundary burst (up to 2x the quota straddling a
//! boundary) — accepted, since the circuit breaker remains the primary
//! downstream protection.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::observability::metrics;

/// Counter for one key in one window.
#[derive(Debug)]
struct RateBucket {
    window_start: u64,
    count: u32,
}

/// Rate limiter tuning.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    /// Enable the limiter. Disabled limiters always admit.
    pub enabled: bool,
    /// Requests admitted per key per window.
    pub limit: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 100,
            window_secs: 60,
        }
    }
}

/// Fixed-window rate limiter keyed by identity or session.
pub struct FixedWindowLimiter {
    buckets: Mutex<HashMap<String, RateBucket>>,
    settings: RateLimitSettings,
}

// Buckets older than the current window are dropped once the map grows
// past this size.
const PRUNE_THRESHOLD: usize = 10_000;

impl FixedWindowLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            settings,
        }
    }

    /// Check and consume quota for a key. Returns false on violation.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, unix_now_secs())
    }

    /// Quota check against an explicit clock, in arrival order.
    pub fn allow_at(&self, key: &str, now_secs: u64) -> bool {
        if !self.settings.enabled {
            return true;
        }

        let window_secs = self.settings.window_secs.max(1);
        let window_start = now_secs - (now_secs % window_secs);

        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");

        if buckets.len() > PRUNE_THRESHOLD {
            buckets.retain(|_, b| b.window_start == window_start);
        }

        let bucket = buckets.entry(key.to_string()).or_insert(RateBucket {
            window_start,
            count: 0,
        });

        // Counter resets to zero on window rollover.
        if bucket.window_start != window_start {
            bucket.window_start = window_start;
            bucket.count = 0;
        }

        if bucket.count < self.settings.limit {
            bucket.count += 1;
            true
        } else {
            tracing::warn!(client = %key, limit = self.settings.limit, "Rate limit exceeded");
            metrics::record_rate_limited();
            false
        }
    }

    /// Drop all counters. Test isolation and operational override.
    pub fn reset(&self) {
        self.buckets
            .lock()
            .expect("rate limiter mutex poisoned")
            .clear();
    }
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
