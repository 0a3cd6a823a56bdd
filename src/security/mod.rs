//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-identity fixed-window quota)
//!     → resilience / session checks
//! ```
//!
//! # Design Decisions
//! - Quota check runs first: cheapest rejection path under overload
//! - Fail closed: a request with no usable rate key is keyed by caller
//! - Window boundaries are deterministic for reproducible accounting

pub mod rate_limit;

pub use rate_limit::{FixedWindowLimiter, RateLimitSettings};
