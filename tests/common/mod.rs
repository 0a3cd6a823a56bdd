//! Shared utilities for integration testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use admission_gateway::admission::{AdmissionGateway, DownstreamFailure};
use admission_gateway::config::GatewayConfig;
use admission_gateway::http::server::DownstreamHandle;
use admission_gateway::session::{DeviceKind, DeviceProof};
use futures_util::future::BoxFuture;
use serde_json::Value;

/// Config hardened for test stability: generous quotas, fast breaker.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.requests_per_window = 10_000;
    config.circuit_breaker.failure_threshold = 3;
    config.circuit_breaker.reset_timeout_secs = 1;
    config.circuit_breaker.max_reset_timeout_secs = 2;
    config.downstream.timeout_secs = 2;
    config.observability.metrics_enabled = false;
    config
}

/// Register an attested device and start a session, returning the token.
pub fn issue_session(gateway: &AdmissionGateway, owner: &str, scopes: &[&str], corr: &str) -> String {
    gateway
        .register_device(
            owner,
            "test-device",
            DeviceKind::Hardware,
            Some(&DeviceProof::Attestation("integration-att".into())),
        )
        .unwrap();
    let scopes: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
    gateway
        .start_session(owner, "test-device", &scopes, 3600, corr, None)
        .unwrap()
        .session_id
        .to_string()
}

/// A programmable downstream: fails until `failures` calls have been
/// observed, then succeeds.
#[allow(dead_code)]
pub fn flaky_downstream(failures: u32) -> (DownstreamHandle, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let handle: DownstreamHandle = Arc::new(
        move |_payload| -> BoxFuture<'static, Result<Value, DownstreamFailure>> {
            let count = seen.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if count < failures {
                    Err(DownstreamFailure("injected failure".into()))
                } else {
                    Ok(serde_json::json!({ "status": "processed" }))
                }
            })
        },
    );
    (handle, calls)
}
