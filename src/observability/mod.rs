//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Metric updates are cheap (atomic increments behind the recorder)
//! - Request IDs flow through tracing spans via the HTTP layer
//! - The in-memory performance window (telemetry) is authoritative for
//!   the /v1/metrics/performance response; the Prometheus exporter is a
//!   parallel sink for scraping

pub mod logging;
pub mod metrics;
