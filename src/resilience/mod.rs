//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Admission façade, per request:
//!     circuit_breaker.rs (fail fast if the resource's circuit is Open)
//!     → downstream call
//!     → record_success / record_failure back into the breaker
//!
//! On repeated reopens:
//!     backoff.rs (exponential reopen timeout with jitter)
//! ```
//!
//! # Design Decisions
//! - Circuits are scoped per protected downstream resource, not global
//! - Open state rejects immediately; no downstream attempt is made
//! - Recovery probes are bounded to avoid hammering a recovering backend

pub mod backoff;
pub mod circuit_breaker;

pub use circuit_breaker::{BreakerConfig, BreakerRegistry, CircuitState};
