//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create the Axum router with all gateway endpoints
//! - Wire up middleware (timeout, tracing, request ID)
//! - Map the admission taxonomy onto HTTP status codes
//! - Hand accepted submissions to the downstream processing stage
//!
//! # Status Mapping
//! ```text
//! Overload       → 429    ReplayDetected → 409
//! Unavailable    → 503    Timeout        → 504
//! Unauthorized   → 401    Internal       → 502
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::admission::{AdmissionError, AdmissionGateway, AdmissionRequest, DownstreamFailure};
use crate::config::GatewayConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::shutdown_signal;
use crate::session::device::unix_now_secs;
use crate::session::{DeviceKind, DeviceProof};

/// Handle invoking the downstream processing stage for one submission.
pub type DownstreamHandle =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, DownstreamFailure>> + Send + Sync>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<AdmissionGateway>,
    pub downstream: DownstreamHandle,
}

/// HTTP server for the admission gateway.
pub struct HttpServer {
    router: Router,
    gateway: Arc<AdmissionGateway>,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server with the default downstream stub, which
    /// acknowledges accepted work with a task receipt. The real
    /// processing backend is an external collaborator wired in via
    /// `with_downstream`.
    pub fn new(config: GatewayConfig, gateway: Arc<AdmissionGateway>) -> Self {
        let downstream: DownstreamHandle =
            Arc::new(|_payload| -> BoxFuture<'static, Result<Value, DownstreamFailure>> {
                Box::pin(async { Ok(json!({ "task_id": Uuid::new_v4(), "status": "queued" })) })
            });
        Self::with_downstream(config, gateway, downstream)
    }

    /// Create a server forwarding accepted submissions to `downstream`.
    pub fn with_downstream(
        config: GatewayConfig,
        gateway: Arc<AdmissionGateway>,
        downstream: DownstreamHandle,
    ) -> Self {
        let state = AppState {
            gateway: gateway.clone(),
            downstream,
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            gateway,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/v1/metrics/performance", get(performance_handler))
            .route("/v1/submit", post(submit_handler))
            .route("/v1/devices", post(register_device_handler))
            .route("/v1/sessions", post(start_session_handler))
            .route("/v1/sessions/validate", post(validate_session_handler))
            .route("/v1/sessions/revoke", post(revoke_session_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        self.run_with_shutdown(listener, shutdown_signal()).await
    }

    /// Run the server until the given future resolves.
    pub async fn run_with_shutdown(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        // Background pruner for terminated sessions and stale records.
        let gateway = self.gateway.clone();
        let prune_interval = Duration::from_secs(self.config.session.prune_interval_secs.max(1));
        let pruner = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(prune_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                gateway.sessions().prune_expired(unix_now_secs());
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        pruner.abort();
        tracing::info!("HTTP server stopped");
        result
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Body for `POST /v1/submit`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub caller: String,
    pub session_id: String,
    #[serde(default)]
    pub required_scopes: Vec<String>,
    #[serde(default = "default_operation")]
    pub operation: String,
    #[serde(default)]
    pub rate_key: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

fn default_operation() -> String {
    "submit".to_string()
}

#[derive(Debug, Deserialize)]
struct RegisterDeviceRequest {
    owner: String,
    device_id: String,
    kind: DeviceKind,
    #[serde(default)]
    proof: Option<DeviceProof>,
}

#[derive(Debug, Deserialize)]
struct StartSessionRequest {
    owner: String,
    device_id: String,
    #[serde(default)]
    scopes: Vec<String>,
    ttl_secs: u64,
    correlation_id: String,
    #[serde(default)]
    proof: Option<DeviceProof>,
}

#[derive(Debug, Deserialize)]
struct ValidateSessionRequest {
    session_id: String,
    caller: String,
    #[serde(default)]
    required_scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RevokeSessionRequest {
    session_id: String,
    caller: String,
}

async fn health_handler(State(state): State<AppState>) -> Response {
    Json(state.gateway.health()).into_response()
}

async fn performance_handler(State(state): State<AppState>) -> Response {
    Json(state.gateway.performance_metrics()).into_response()
}

async fn submit_handler(
    State(state): State<AppState>,
    Json(body): Json<SubmitRequest>,
) -> Response {
    if body.caller.is_empty() {
        return (StatusCode::BAD_REQUEST, "caller must not be empty").into_response();
    }

    let request = AdmissionRequest {
        caller: body.caller,
        session_id: body.session_id,
        required_scopes: body.required_scopes,
        operation: body.operation,
        rate_key: body.rate_key,
        resource: body.resource,
    };

    let downstream = state.downstream.clone();
    let payload = body.payload;
    match state
        .gateway
        .submit(request, move || downstream(payload))
        .await
    {
        Ok(result) => Json(json!({ "status": "accepted", "result": result })).into_response(),
        Err(e) => error_response(e),
    }
}

async fn register_device_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterDeviceRequest>,
) -> Response {
    if body.owner.is_empty() || body.device_id.is_empty() {
        return (StatusCode::BAD_REQUEST, "owner and device_id must not be empty").into_response();
    }

    match state.gateway.register_device(
        &body.owner,
        &body.device_id,
        body.kind,
        body.proof.as_ref(),
    ) {
        Ok(trust_level) => Json(json!({ "trust_level": trust_level })).into_response(),
        Err(e) => error_response(e),
    }
}

async fn start_session_handler(
    State(state): State<AppState>,
    Json(body): Json<StartSessionRequest>,
) -> Response {
    if body.owner.is_empty() || body.correlation_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "owner and correlation_id must not be empty",
        )
            .into_response();
    }

    match state.gateway.start_session(
        &body.owner,
        &body.device_id,
        &body.scopes,
        body.ttl_secs,
        &body.correlation_id,
        body.proof.as_ref(),
    ) {
        Ok(started) => Json(json!({
            "session_id": started.session_id,
            "risk_score": started.risk_score,
            "expires_at": started.expires_at,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn validate_session_handler(
    State(state): State<AppState>,
    Json(body): Json<ValidateSessionRequest>,
) -> Response {
    // Fails closed inside the gateway; always a 200 with a verdict.
    let outcome =
        state
            .gateway
            .validate_session(&body.session_id, &body.caller, &body.required_scopes);
    Json(outcome).into_response()
}

async fn revoke_session_handler(
    State(state): State<AppState>,
    Json(body): Json<RevokeSessionRequest>,
) -> Response {
    match state.gateway.revoke_session(&body.session_id, &body.caller) {
        Ok(revoked) => Json(json!({ "revoked": revoked })).into_response(),
        Err(e) => error_response(e),
    }
}

/// Map an admission error onto a status code and JSON body.
fn error_response(error: AdmissionError) -> Response {
    let (status, kind) = match &error {
        AdmissionError::Overload => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        AdmissionError::Unavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, "circuit_open"),
        AdmissionError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "session_invalid"),
        AdmissionError::ReplayDetected => (StatusCode::CONFLICT, "replay_detected"),
        AdmissionError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        AdmissionError::Internal(_) => (StatusCode::BAD_GATEWAY, "internal"),
    };
    (
        status,
        Json(json!({ "kind": kind, "error": error.to_string() })),
    )
        .into_response()
}
