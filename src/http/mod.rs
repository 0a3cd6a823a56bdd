//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, routes, layers)
//!     → request.rs (request ID generation and propagation)
//!     → admission façade (rate limit → breaker → session → downstream)
//!     → JSON response with mapped status code
//! ```

pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{HttpServer, SubmitRequest};
