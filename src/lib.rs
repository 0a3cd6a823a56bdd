//! Request Admission & Session Resilience Layer
//!
//! Gateway logic every inbound request to the shared processing service
//! passes through before reaching business logic: session and scope
//! admission, circuit breaking for the downstream processing stage,
//! per-identity quotas, and rolling-window performance measurement.

// Core subsystems
pub mod admission;
pub mod config;
pub mod http;
pub mod session;

// Traffic protection
pub mod resilience;
pub mod security;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod telemetry;

pub use admission::{AdmissionError, AdmissionGateway, AdmissionRequest, GatewayResult};
pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
