//! Admission façade.
//!
//! The sole externally visible entry point of the gateway. Per request:
//!
//! ```text
//! rate limiter → circuit breaker → session validation → downstream call
//!      429            503              401/409              (timeout-bounded)
//! ```
//!
//! Ordering is deliberate: the cheapest rejection path runs first,
//! minimizing wasted work under overload or attack. Every completion —
//! accepted, rejected, failed — is recorded into the tracker with its
//! outcome tag, so breaker decisions and the performance snapshot see
//! the same normalized failure semantics.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::config::GatewayConfig;
use crate::resilience::{BreakerConfig, BreakerRegistry, CircuitState};
use crate::resilience::circuit_breaker::BreakerStatus;
use crate::security::{FixedWindowLimiter, RateLimitSettings};
use crate::session::{
    DeviceKind, DeviceProof, RegisterError, SessionDenied, SessionManager, SessionSettings,
    StartError, StartedSession, ValidationOutcome,
};
use crate::telemetry::{LatencyTracker, PerformanceSnapshot};

/// Why an operation was refused or failed. Closed taxonomy; every
/// boundary returns this instead of panicking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// Per-key quota exhausted. Caller backs off; no retry here.
    #[error("rate limit exceeded")]
    Overload,

    /// Circuit open for the protected resource; rejected fail-fast.
    #[error("downstream resource '{resource}' unavailable")]
    Unavailable { resource: String },

    /// Session admission refused (unknown/expired/revoked/wrong owner/
    /// insufficient scope/untrusted device).
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] SessionDenied),

    /// Correlation id already backed a session creation.
    #[error("correlation id already used")]
    ReplayDetected,

    /// Downstream call exceeded its deadline. Counted toward the
    /// breaker like any failure.
    #[error("downstream call timed out after {after_secs}s")]
    Timeout { after_secs: u64 },

    /// Downstream reported a failure.
    #[error("internal failure: {0}")]
    Internal(String),
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, AdmissionError>;

/// Failure reported by the downstream processing stage.
#[derive(Debug, Clone, thiserror::Error)]
#[error("downstream failure: {0}")]
pub struct DownstreamFailure(pub String);

/// One request presented for admission.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    /// Asserted caller identity; checked against the session's owner.
    pub caller: String,
    /// Opaque session token from `start_session`.
    pub session_id: String,
    /// Scopes this request needs; must be a subset of granted scopes.
    pub required_scopes: Vec<String>,
    /// Telemetry tag for the operation (e.g. "submit").
    pub operation: String,
    /// Quota key; defaults to the caller identity.
    pub rate_key: Option<String>,
    /// Protected resource; defaults to the configured downstream.
    pub resource: Option<String>,
}

impl AdmissionRequest {
    pub fn new(caller: &str, session_id: &str, required_scopes: &[&str]) -> Self {
        Self {
            caller: caller.to_string(),
            session_id: session_id.to_string(),
            required_scopes: required_scopes.iter().map(|s| s.to_string()).collect(),
            operation: "submit".to_string(),
            rate_key: None,
            resource: None,
        }
    }
}

/// Gateway health as seen by operators and load balancers.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// State of the default downstream circuit.
    pub circuit_breaker: CircuitState,
    /// True only when the default circuit is closed.
    pub is_healthy: bool,
    /// Every tracked circuit, for drill-down.
    pub breakers: Vec<BreakerStatus>,
    pub active_sessions: usize,
    pub registered_devices: usize,
}

/// Request Admission & Session Resilience Layer.
///
/// Owns every component's state exclusively; cross-component
/// communication happens only through the calls below.
pub struct AdmissionGateway {
    tracker: LatencyTracker,
    breakers: BreakerRegistry,
    limiter: FixedWindowLimiter,
    sessions: SessionManager,
    downstream_resource: String,
    downstream_timeout: Duration,
}

impl AdmissionGateway {
    /// Build a gateway from a validated configuration with a fresh
    /// session manager.
    pub fn new(config: &GatewayConfig) -> Self {
        let sessions = SessionManager::new(
            settings_from(config),
            config
                .persistence
                .enabled
                .then(|| config.persistence.path.clone()),
        );
        Self::with_sessions(config, sessions)
    }

    /// Build a gateway around an existing session manager (e.g. one
    /// restored from a snapshot).
    pub fn with_sessions(config: &GatewayConfig, sessions: SessionManager) -> Self {
        let breaker = &config.circuit_breaker;
        Self {
            tracker: LatencyTracker::new(config.tracker.sample_capacity),
            breakers: BreakerRegistry::new(BreakerConfig {
                enabled: breaker.enabled,
                failure_threshold: breaker.failure_threshold,
                failure_window: Duration::from_secs(breaker.failure_window_secs),
                reset_timeout: Duration::from_secs(breaker.reset_timeout_secs),
                max_reset_timeout: Duration::from_secs(breaker.max_reset_timeout_secs),
                half_open_max_probes: breaker.half_open_max_probes,
            }),
            limiter: FixedWindowLimiter::new(RateLimitSettings {
                enabled: config.rate_limit.enabled,
                limit: config.rate_limit.requests_per_window,
                window_secs: config.rate_limit.window_secs,
            }),
            sessions,
            downstream_resource: config.downstream.resource.clone(),
            downstream_timeout: Duration::from_secs(config.downstream.timeout_secs),
        }
    }

    /// Admit a request and run the downstream call.
    ///
    /// The downstream future is invoked only after every admission check
    /// passes, and is bounded by the configured deadline; expiry is
    /// recorded as a `timeout` failure, identically to an explicit one.
    pub async fn submit<T, F, Fut>(&self, request: AdmissionRequest, downstream: F) -> GatewayResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DownstreamFailure>>,
    {
        let timer = self.tracker.start_timer(&request.operation);

        let rate_key = request.rate_key.as_deref().unwrap_or(&request.caller);
        if !self.limiter.allow(rate_key) {
            self.tracker
                .record_latency(timer, "rate_limit_violation", false);
            return Err(AdmissionError::Overload);
        }

        let resource = request
            .resource
            .as_deref()
            .unwrap_or(&self.downstream_resource)
            .to_string();
        if !self.breakers.check(&resource) {
            self.tracker
                .record_latency(timer, "circuit_breaker_trip", false);
            return Err(AdmissionError::Unavailable { resource });
        }

        let outcome = self.sessions.validate(
            &request.session_id,
            &request.caller,
            &request.required_scopes,
        );
        if !outcome.valid {
            let reason = outcome.reason.unwrap_or(SessionDenied::UnknownSession);
            // Folds into the generic failure bucket.
            self.tracker.record_latency(timer, "session_invalid", false);
            return Err(AdmissionError::Unauthorized(reason));
        }

        match tokio::time::timeout(self.downstream_timeout, downstream()).await {
            Ok(Ok(value)) => {
                self.breakers.record_success(&resource);
                self.tracker.record_latency(timer, &request.operation, true);
                Ok(value)
            }
            Ok(Err(DownstreamFailure(message))) => {
                self.breakers.record_failure(&resource);
                self.tracker.record_latency(timer, "failure", false);
                tracing::error!(resource = %resource, error = %message, "Downstream failure");
                Err(AdmissionError::Internal(message))
            }
            Err(_) => {
                self.breakers.record_failure(&resource);
                self.tracker.record_latency(timer, "timeout", false);
                tracing::error!(
                    resource = %resource,
                    timeout_secs = self.downstream_timeout.as_secs(),
                    "Downstream call timed out"
                );
                Err(AdmissionError::Timeout {
                    after_secs: self.downstream_timeout.as_secs(),
                })
            }
        }
    }

    /// Register a device for an owner.
    pub fn register_device(
        &self,
        owner: &str,
        device_id: &str,
        kind: DeviceKind,
        proof: Option<&DeviceProof>,
    ) -> GatewayResult<u8> {
        self.sessions
            .devices()
            .register(owner, device_id, kind, proof)
            .map_err(|RegisterError::OwnedByOther| {
                AdmissionError::Unauthorized(SessionDenied::DeviceNotOwned)
            })
    }

    /// Start a session, mapping session-layer refusals into the
    /// admission taxonomy.
    pub fn start_session(
        &self,
        owner: &str,
        device_id: &str,
        scopes: &[String],
        ttl_secs: u64,
        correlation_id: &str,
        proof: Option<&DeviceProof>,
    ) -> GatewayResult<StartedSession> {
        self.sessions
            .start_session(owner, device_id, scopes, ttl_secs, correlation_id, proof)
            .map_err(|e| match e {
                StartError::ReplayDetected => AdmissionError::ReplayDetected,
                StartError::Denied(denied) => AdmissionError::Unauthorized(denied),
            })
    }

    /// Validate a session. Fails closed; never errors.
    pub fn validate_session(
        &self,
        session_id: &str,
        caller: &str,
        required_scopes: &[String],
    ) -> ValidationOutcome {
        self.sessions.validate(session_id, caller, required_scopes)
    }

    /// Revoke a session; returns whether this call revoked it.
    pub fn revoke_session(&self, session_id: &str, caller: &str) -> GatewayResult<bool> {
        self.sessions
            .revoke(session_id, caller)
            .map_err(AdmissionError::Unauthorized)
    }

    /// Operational health. Never fails, whatever state the breaker is in.
    pub fn health(&self) -> HealthReport {
        let state = self.breakers.state(&self.downstream_resource);
        HealthReport {
            circuit_breaker: state,
            is_healthy: state == CircuitState::Closed,
            breakers: self.breakers.statuses(),
            active_sessions: self.sessions.active_session_count(),
            registered_devices: self.sessions.devices().count(),
        }
    }

    /// Current performance snapshot, recomputed from the live window.
    pub fn performance_metrics(&self) -> PerformanceSnapshot {
        self.tracker.snapshot()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Reset the measurement window and rate counters. Test isolation
    /// and operational override; session state is untouched.
    pub fn reset_telemetry(&self) {
        self.tracker.reset();
        self.limiter.reset();
    }
}

/// Session settings derived from a gateway config, for restoring a
/// manager from a snapshot before handing it to `with_sessions`.
pub fn settings_from(config: &GatewayConfig) -> SessionSettings {
    SessionSettings {
        max_ttl_secs: config.session.max_ttl_secs,
        correlation_capacity: config.session.correlation_capacity,
        correlation_retention_secs: config.session.correlation_retention_secs,
        usage_window_secs: config.session.usage_window_secs,
    }
}
