//! Session management subsystem.
//!
//! # Data Flow
//! ```text
//! Device registration:
//!     proof → device.rs (trust assignment) → registry
//!
//! Session start:
//!     correlation id → replay check
//!     device trust + scopes → risk scoring, attestation policy
//!     → manager.rs (session issued, correlation recorded)
//!
//! Validation (per request, fixed order):
//!     owner binding → expiry/revocation → scope subset
//!     first failure short-circuits with a distinguished reason
//!
//! Restart:
//!     store.rs (devices, active sessions, correlation set persisted)
//! ```
//!
//! # Design Decisions
//! - Sessions are never resurrected: expiry and revocation are terminal
//! - Granted scopes are immutable after creation, never widened
//! - Validation fails closed; it never panics on malformed input
//! - Replay protection is instance-scoped unless backed by a shared store

pub mod device;
pub mod manager;
pub mod store;

pub use device::{Device, DeviceKind, DeviceProof, DeviceRegistry, RegisterError};
pub use manager::{
    Session, SessionDenied, SessionManager, SessionSettings, StartError, StartedSession,
    ValidationOutcome,
};
