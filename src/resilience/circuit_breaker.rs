//! Circuit breaker for downstream processing protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: downstream assumed down, requests fail fast
//! - Half-Open: testing if the downstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold within window
//! Open → Half-Open: after the reopen timeout elapses
//! Half-Open → Closed: probe request succeeds
//! Half-Open → Open: probe request fails (timeout restarts, with backoff)
//! ```
//!
//! # Design Decisions
//! - Per-resource circuit (not global): a failing processing backend must
//!   not block unrelated identity/session operations
//! - Fail fast in Open state; no downstream attempt is made
//! - Bounded probes in Half-Open (prevents hammering a recovering backend)
//! - A single isolated failure never trips the circuit (threshold >= 2)
//! - Open → Half-Open is evaluated lazily on the next admission check

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::observability::metrics;
use crate::resilience::backoff::reopen_timeout;

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation; requests pass through.
    Closed,
    /// Failing fast; requests are rejected immediately.
    Open,
    /// Probing; a bounded number of trial requests are admitted.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Circuit breaker tuning.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Enable the breaker. Disabled circuits always admit.
    pub enabled: bool,
    /// Failures within the window required to trip. Clamped to >= 2 so a
    /// single isolated failure never opens the circuit.
    pub failure_threshold: u32,
    /// Sliding window over which failures are counted.
    pub failure_window: Duration,
    /// Base duration an Open circuit holds before probing.
    pub reset_timeout: Duration,
    /// Cap for the backed-off reopen timeout.
    pub max_reset_timeout: Duration,
    /// Trial requests admitted per Half-Open period.
    pub half_open_max_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            reset_timeout: Duration::from_secs(60),
            max_reset_timeout: Duration::from_secs(600),
            half_open_max_probes: 3,
        }
    }
}

/// Per-resource breaker state. Mutated only through the registry.
#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    /// Failures observed in the current sliding window (Closed state).
    windowed_failures: u32,
    window_started: Instant,
    /// Consecutive failures without an intervening success.
    consecutive_failures: u32,
    /// Consecutive reopens without a full recovery; drives backoff.
    reopen_count: u32,
    /// Probes admitted in the current Half-Open period.
    half_open_probes: u32,
    opened_until: Option<Instant>,
    last_transition: Instant,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            windowed_failures: 0,
            window_started: Instant::now(),
            consecutive_failures: 0,
            reopen_count: 0,
            half_open_probes: 0,
            opened_until: None,
            last_transition: Instant::now(),
        }
    }
}

/// Point-in-time view of one circuit, for health and admin surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    pub resource: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Milliseconds until the circuit probes again, when Open.
    pub open_remaining_ms: Option<u64>,
}

/// Registry of circuit breakers, one per protected downstream resource.
pub struct BreakerRegistry {
    circuits: Mutex<HashMap<String, Circuit>>,
    config: BreakerConfig,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Admission check for a resource.
    ///
    /// Returns `false` when the circuit is Open (or Half-Open with all
    /// probe slots taken). Lazily transitions Open → Half-Open once the
    /// reopen timeout has elapsed.
    pub fn check(&self, resource: &str) -> bool {
        if !self.config.enabled {
            return true;
        }

        let mut circuits = self.circuits.lock().expect("breaker mutex poisoned");
        let circuit = circuits
            .entry(resource.to_string())
            .or_insert_with(Circuit::new);

        match circuit.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let due = circuit
                    .opened_until
                    .map(|t| Instant::now() >= t)
                    .unwrap_or(true);
                if due {
                    tracing::info!(resource, "Circuit breaker transitioning to half-open");
                    circuit.state = CircuitState::HalfOpen;
                    circuit.half_open_probes = 1;
                    circuit.last_transition = Instant::now();
                    metrics::record_breaker_transition(resource, "half_open");
                    true
                } else {
                    tracing::debug!(resource, "Circuit open, rejecting request");
                    false
                }
            }
            CircuitState::HalfOpen => {
                if circuit.half_open_probes < self.config.half_open_max_probes {
                    circuit.half_open_probes += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful downstream call.
    pub fn record_success(&self, resource: &str) {
        if !self.config.enabled {
            return;
        }

        let mut circuits = self.circuits.lock().expect("breaker mutex poisoned");
        let Some(circuit) = circuits.get_mut(resource) else {
            return;
        };

        circuit.consecutive_failures = 0;
        match circuit.state {
            CircuitState::Closed => {
                circuit.windowed_failures = 0;
            }
            CircuitState::HalfOpen => {
                tracing::info!(resource, "Circuit breaker closed after successful probe");
                circuit.state = CircuitState::Closed;
                circuit.windowed_failures = 0;
                circuit.reopen_count = 0;
                circuit.half_open_probes = 0;
                circuit.opened_until = None;
                circuit.last_transition = Instant::now();
                metrics::record_breaker_transition(resource, "closed");
            }
            CircuitState::Open => {
                // A call admitted just before the trip finished late.
            }
        }
    }

    /// Record a failed downstream call.
    pub fn record_failure(&self, resource: &str) {
        if !self.config.enabled {
            return;
        }
        let threshold = self.config.failure_threshold.max(2);

        let mut circuits = self.circuits.lock().expect("breaker mutex poisoned");
        let circuit = circuits
            .entry(resource.to_string())
            .or_insert_with(Circuit::new);

        circuit.consecutive_failures += 1;
        match circuit.state {
            CircuitState::Closed => {
                if circuit.window_started.elapsed() > self.config.failure_window {
                    circuit.windowed_failures = 0;
                    circuit.window_started = Instant::now();
                }
                circuit.windowed_failures += 1;

                if circuit.windowed_failures >= threshold {
                    let hold = reopen_timeout(
                        0,
                        self.config.reset_timeout,
                        self.config.max_reset_timeout,
                    );
                    tracing::warn!(
                        resource,
                        failures = circuit.windowed_failures,
                        threshold,
                        hold_ms = hold.as_millis() as u64,
                        "Circuit breaker tripped"
                    );
                    circuit.state = CircuitState::Open;
                    circuit.reopen_count = 0;
                    circuit.opened_until = Some(Instant::now() + hold);
                    circuit.last_transition = Instant::now();
                    metrics::record_breaker_transition(resource, "open");
                }
            }
            CircuitState::HalfOpen => {
                circuit.reopen_count += 1;
                let hold = reopen_timeout(
                    circuit.reopen_count,
                    self.config.reset_timeout,
                    self.config.max_reset_timeout,
                );
                tracing::warn!(
                    resource,
                    reopen_count = circuit.reopen_count,
                    hold_ms = hold.as_millis() as u64,
                    "Circuit breaker reopened after probe failure"
                );
                circuit.state = CircuitState::Open;
                circuit.half_open_probes = 0;
                circuit.opened_until = Some(Instant::now() + hold);
                circuit.last_transition = Instant::now();
                metrics::record_breaker_transition(resource, "open");
            }
            CircuitState::Open => {
                // Late failure from a call admitted before the trip.
            }
        }
    }

    /// Current state for a resource. Unknown resources report Closed.
    pub fn state(&self, resource: &str) -> CircuitState {
        let circuits = self.circuits.lock().expect("breaker mutex poisoned");
        circuits
            .get(resource)
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Status of every tracked circuit.
    pub fn statuses(&self) -> Vec<BreakerStatus> {
        let circuits = self.circuits.lock().expect("breaker mutex poisoned");
        circuits
            .iter()
            .map(|(resource, c)| BreakerStatus {
                resource: resource.clone(),
                state: c.state,
                consecutive_failures: c.consecutive_failures,
                open_remaining_ms: c.opened_until.and_then(|t| {
                    t.checked_duration_since(Instant::now())
                        .map(|d| d.as_millis() as u64)
                }),
            })
            .collect()
    }

    /// Force a circuit back to Closed.
    pub fn reset(&self, resource: &str) {
        let mut circuits = self.circuits.lock().expect("breaker mutex poisoned");
        if let Some(circuit) = circuits.get_mut(resource) {
            tracing::info!(resource, "Circuit breaker manually reset");
            *circuit = Circuit::new();
        }
    }

    /// Force every circuit back to Closed.
    pub fn reset_all(&self) {
        let mut circuits = self.circuits.lock().expect("breaker mutex poisoned");
        circuits.clear();
    }
}
