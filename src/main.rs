//! Admission Gateway (v1)
//!
//! The request admission and session resilience layer in front of the
//! shared task-processing service.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌────────────────────────────────────────────────────┐
//!                     │                 ADMISSION GATEWAY                  │
//!                     │                                                    │
//!   Client Request    │  ┌─────────┐   ┌──────────┐   ┌────────────────┐  │
//!   ──────────────────┼─▶│  http   │──▶│ security │──▶│   resilience   │  │
//!                     │  │ server  │   │rate limit│   │circuit breaker │  │
//!                     │  └─────────┘   └──────────┘   └───────┬────────┘  │
//!                     │                                       │           │
//!                     │                                       ▼           │
//!                     │                               ┌──────────────┐    │
//!                     │                               │   session    │    │
//!                     │                               │  validation  │    │
//!                     │                               └──────┬───────┘    │
//!                     │                                      │            │
//!   Client Response   │  ┌───────────┐   ┌──────────┐   ┌────▼───────┐    │     Processing
//!   ◀─────────────────┼──│  status   │◀──│telemetry │◀──│ downstream │◀───┼──── backend
//!                     │  │  mapping  │   │ tracker  │   │    call    │    │     (external)
//!                     │  └───────────┘   └──────────┘   └────────────┘    │
//!                     │                                                   │
//!                     │  ┌─────────────────────────────────────────────┐  │
//!                     │  │            Cross-Cutting Concerns           │  │
//!                     │  │  ┌────────┐ ┌─────────────┐ ┌────────────┐  │  │
//!                     │  │  │ config │ │observability│ │ lifecycle  │  │  │
//!                     │  │  └────────┘ └─────────────┘ └────────────┘  │  │
//!                     │  └─────────────────────────────────────────────┘  │
//!                     └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use admission_gateway::admission::{settings_from, AdmissionGateway};
use admission_gateway::config::{load_config, GatewayConfig};
use admission_gateway::http::HttpServer;
use admission_gateway::observability::{logging, metrics};
use admission_gateway::session::SessionManager;

#[derive(Parser)]
#[command(name = "admission-gateway")]
#[command(about = "Request admission and session resilience gateway", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("admission-gateway v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        downstream_resource = %config.downstream.resource,
        rate_limit = config.rate_limit.requests_per_window,
        breaker_threshold = config.circuit_breaker.failure_threshold,
        persistence = config.persistence.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // Restore persisted session state (devices, live sessions, replay
    // records); the tracker window and rate counters rebuild from
    // traffic.
    let sessions = if config.persistence.enabled {
        SessionManager::load_from_file(&config.persistence.path, settings_from(&config))?
    } else {
        SessionManager::new(settings_from(&config), None)
    };
    let gateway = Arc::new(AdmissionGateway::with_sessions(&config, sessions));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let persist = config.persistence.enabled;
    let server = HttpServer::new(config, gateway.clone());
    server.run(listener).await?;

    if persist {
        gateway.sessions().save_to_file()?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
