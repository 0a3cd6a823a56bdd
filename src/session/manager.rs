//! Session lifecycle, scope authorization, and replay protection.
//!
//! # Session State Machine
//! ```text
//! Created -(validated)-> Active -(expiry | revoke)-> Terminated
//! ```
//! No resurrection: a terminated session never validates again.
//!
//! # Validation Order
//! Checks run in fixed order: owner binding → expiry/revocation → scope.
//! The first failure short-circuits with a distinguished reason, and the
//! whole path fails closed — unknown or malformed tokens yield
//! `valid=false`, never a panic.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observability::metrics;
use crate::session::device::{unix_now_secs, DeviceProof, DeviceRegistry};

/// An issued session. Scopes are fixed at creation and never widened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub owner: String,
    pub device_id: String,
    pub granted_scopes: BTreeSet<String>,
    /// Seconds since epoch.
    pub created_at: u64,
    /// `created_at + ttl`.
    pub expires_at: u64,
    pub correlation_id: String,
    pub risk_score: u8,
    pub revoked_at: Option<u64>,
}

/// Dedup record for one accepted session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub correlation_id: String,
    pub first_seen_at: u64,
}

/// Session manager tuning.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Longest ttl a caller may request, in seconds.
    pub max_ttl_secs: u64,
    /// Correlation records kept before the oldest are dropped.
    pub correlation_capacity: usize,
    /// Correlation records older than this are dropped on prune.
    pub correlation_retention_secs: u64,
    /// Window over which per-owner session starts feed usage risk.
    pub usage_window_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_ttl_secs: 86_400,
            correlation_capacity: 10_000,
            correlation_retention_secs: 86_400,
            usage_window_secs: 3_600,
        }
    }
}

/// Why a session operation was refused. Closed set; serialized as the
/// `reason` field of validation responses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SessionDenied {
    #[error("unknown session")]
    UnknownSession,
    #[error("malformed session token")]
    MalformedToken,
    #[error("session owner mismatch")]
    OwnerMismatch,
    #[error("session expired")]
    Expired,
    #[error("session revoked")]
    Revoked,
    #[error("insufficient scope: missing {missing}")]
    InsufficientScope { missing: String },
    #[error("unknown device")]
    UnknownDevice,
    #[error("device is registered to another identity")]
    DeviceNotOwned,
    #[error("attestation required: trust {trust} below required {required}")]
    AttestationRequired { required: u8, trust: u8 },
    #[error("requested ttl exceeds maximum of {max_ttl_secs}s")]
    TtlTooLong { max_ttl_secs: u64 },
}

/// Why a session start failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    /// The correlation id already backed a session creation.
    #[error("correlation id already used")]
    ReplayDetected,
    #[error(transparent)]
    Denied(#[from] SessionDenied),
}

/// Successful session start.
#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub session_id: Uuid,
    pub risk_score: u8,
    pub expires_at: u64,
}

/// Result of validating a session. Fails closed: `valid=false` with a
/// reason rather than an error.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ttl: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SessionDenied>,
}

impl ValidationOutcome {
    fn denied(reason: SessionDenied) -> Self {
        Self {
            valid: false,
            remaining_ttl: None,
            risk_score: None,
            reason: Some(reason),
        }
    }
}

/// Append-only correlation set with bounded retention.
#[derive(Default)]
struct CorrelationSet {
    by_id: HashMap<String, u64>,
    order: VecDeque<CorrelationRecord>,
}

impl CorrelationSet {
    fn contains(&self, correlation_id: &str) -> bool {
        self.by_id.contains_key(correlation_id)
    }

    fn record(&mut self, correlation_id: &str, now: u64) {
        self.by_id.insert(correlation_id.to_string(), now);
        self.order.push_back(CorrelationRecord {
            correlation_id: correlation_id.to_string(),
            first_seen_at: now,
        });
    }

    fn prune(&mut self, capacity: usize, retention_secs: u64, now: u64) {
        let cutoff = now.saturating_sub(retention_secs);
        while let Some(front) = self.order.front() {
            if self.order.len() > capacity || front.first_seen_at < cutoff {
                let record = self.order.pop_front().expect("front checked above");
                self.by_id.remove(&record.correlation_id);
            } else {
                break;
            }
        }
    }
}

/// Owns sessions, the device registry, and replay state.
pub struct SessionManager {
    devices: DeviceRegistry,
    sessions: DashMap<Uuid, Session>,
    correlations: Mutex<CorrelationSet>,
    /// Per-owner session start timestamps inside the usage window.
    recent_starts: Mutex<HashMap<String, Vec<u64>>>,
    settings: SessionSettings,
    pub(crate) persistence_path: Option<String>,
}

impl SessionManager {
    pub fn new(settings: SessionSettings, persistence_path: Option<String>) -> Self {
        Self {
            devices: DeviceRegistry::new(),
            sessions: DashMap::new(),
            correlations: Mutex::new(CorrelationSet::default()),
            recent_starts: Mutex::new(HashMap::new()),
            settings,
            persistence_path,
        }
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    /// Start a session for `owner` on a registered device.
    pub fn start_session(
        &self,
        owner: &str,
        device_id: &str,
        scopes: &[String],
        ttl_secs: u64,
        correlation_id: &str,
        proof: Option<&DeviceProof>,
    ) -> Result<StartedSession, StartError> {
        self.start_session_at(
            owner,
            device_id,
            scopes,
            ttl_secs,
            correlation_id,
            proof,
            unix_now_secs(),
        )
    }

    /// Session start against an explicit clock.
    #[allow(clippy::too_many_arguments)]
    pub fn start_session_at(
        &self,
        owner: &str,
        device_id: &str,
        scopes: &[String],
        ttl_secs: u64,
        correlation_id: &str,
        proof: Option<&DeviceProof>,
        now: u64,
    ) -> Result<StartedSession, StartError> {
        // Replay first: a correlation id backs at most one creation.
        if self
            .correlations
            .lock()
            .expect("correlation mutex poisoned")
            .contains(correlation_id)
        {
            tracing::warn!(owner, correlation_id, "Replayed session start rejected");
            metrics::record_session_event("replay_detected");
            return Err(StartError::ReplayDetected);
        }

        if ttl_secs > self.settings.max_ttl_secs {
            return Err(SessionDenied::TtlTooLong {
                max_ttl_secs: self.settings.max_ttl_secs,
            }
            .into());
        }

        let device = self
            .devices
            .get(device_id)
            .ok_or(SessionDenied::UnknownDevice)?;
        if device.owner != owner {
            return Err(SessionDenied::DeviceNotOwned.into());
        }

        // Risk-bearing scopes demand either earned trust or step-up proof.
        let required = required_trust(scopes);
        if proof.is_none() && device.trust_level < required {
            tracing::warn!(
                owner,
                device_id,
                trust = device.trust_level,
                required,
                "Session start rejected: attestation required"
            );
            return Err(SessionDenied::AttestationRequired {
                required,
                trust: device.trust_level,
            }
            .into());
        }

        let usage_count = self.note_session_start(owner, now);
        let risk_score = (10 - device.trust_level)
            .saturating_add(scope_risk(scopes))
            .saturating_add(usage_pattern_risk(usage_count))
            .saturating_add(session_age_risk(ttl_secs));

        let session = Session {
            session_id: Uuid::new_v4(),
            owner: owner.to_string(),
            device_id: device_id.to_string(),
            granted_scopes: scopes.iter().cloned().collect(),
            created_at: now,
            expires_at: now + ttl_secs,
            correlation_id: correlation_id.to_string(),
            risk_score,
            revoked_at: None,
        };

        let started = StartedSession {
            session_id: session.session_id,
            risk_score,
            expires_at: session.expires_at,
        };

        {
            let mut correlations = self
                .correlations
                .lock()
                .expect("correlation mutex poisoned");
            correlations.record(correlation_id, now);
            correlations.prune(
                self.settings.correlation_capacity,
                self.settings.correlation_retention_secs,
                now,
            );
        }
        self.sessions.insert(session.session_id, session);

        tracing::info!(
            owner,
            device_id,
            session_id = %started.session_id,
            risk_score,
            ttl_secs,
            "Session started"
        );
        metrics::record_session_event("started");
        Ok(started)
    }

    /// Validate a session token against an asserted caller and scopes.
    pub fn validate(
        &self,
        session_id: &str,
        caller: &str,
        required_scopes: &[String],
    ) -> ValidationOutcome {
        self.validate_at(session_id, caller, required_scopes, unix_now_secs())
    }

    /// Validation against an explicit clock.
    pub fn validate_at(
        &self,
        session_id: &str,
        caller: &str,
        required_scopes: &[String],
        now: u64,
    ) -> ValidationOutcome {
        let id = match Uuid::parse_str(session_id) {
            Ok(id) => id,
            Err(_) => return ValidationOutcome::denied(SessionDenied::MalformedToken),
        };
        let Some(session) = self.sessions.get(&id) else {
            return ValidationOutcome::denied(SessionDenied::UnknownSession);
        };

        // Hijack binding: a syntactically valid token presented by the
        // wrong identity is rejected before anything else.
        if session.owner != caller {
            tracing::warn!(session_id = %id, caller, "Session validation rejected: owner mismatch");
            return ValidationOutcome::denied(SessionDenied::OwnerMismatch);
        }

        if now > session.expires_at {
            return ValidationOutcome::denied(SessionDenied::Expired);
        }
        if session.revoked_at.is_some() {
            return ValidationOutcome::denied(SessionDenied::Revoked);
        }

        for scope in required_scopes {
            if !session.granted_scopes.contains(scope) {
                return ValidationOutcome::denied(SessionDenied::InsufficientScope {
                    missing: scope.clone(),
                });
            }
        }

        ValidationOutcome {
            valid: true,
            remaining_ttl: Some(session.expires_at - now),
            risk_score: Some(session.risk_score),
            reason: None,
        }
    }

    /// Revoke a session. Owner-checked and idempotent; returns whether
    /// this call performed the revocation.
    pub fn revoke(&self, session_id: &str, caller: &str) -> Result<bool, SessionDenied> {
        let id = Uuid::parse_str(session_id).map_err(|_| SessionDenied::MalformedToken)?;
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionDenied::UnknownSession)?;
        if session.owner != caller {
            return Err(SessionDenied::OwnerMismatch);
        }
        if session.revoked_at.is_some() {
            return Ok(false);
        }

        session.revoked_at = Some(unix_now_secs());
        tracing::info!(session_id = %id, "Session revoked");
        metrics::record_session_event("revoked");
        Ok(true)
    }

    /// Drop terminated sessions and stale correlation/usage records.
    pub fn prune_expired(&self, now: u64) {
        self.sessions
            .retain(|_, s| s.revoked_at.is_none() && now <= s.expires_at);
        self.correlations
            .lock()
            .expect("correlation mutex poisoned")
            .prune(
                self.settings.correlation_capacity,
                self.settings.correlation_retention_secs,
                now,
            );

        let cutoff = now.saturating_sub(self.settings.usage_window_secs);
        let mut recent = self.recent_starts.lock().expect("usage mutex poisoned");
        recent.retain(|_, starts| {
            starts.retain(|t| *t >= cutoff);
            !starts.is_empty()
        });
    }

    /// Number of live (unexpired, unrevoked) sessions.
    pub fn active_session_count(&self) -> usize {
        let now = unix_now_secs();
        self.sessions
            .iter()
            .filter(|s| s.revoked_at.is_none() && now <= s.expires_at)
            .count()
    }

    pub(crate) fn export_sessions(&self) -> Vec<Session> {
        self.sessions.iter().map(|s| s.value().clone()).collect()
    }

    pub(crate) fn import_sessions(&self, sessions: Vec<Session>) {
        self.sessions.clear();
        for session in sessions {
            self.sessions.insert(session.session_id, session);
        }
    }

    pub(crate) fn export_correlations(&self) -> Vec<CorrelationRecord> {
        self.correlations
            .lock()
            .expect("correlation mutex poisoned")
            .order
            .iter()
            .cloned()
            .collect()
    }

    pub(crate) fn import_correlations(&self, records: Vec<CorrelationRecord>) {
        let mut correlations = self
            .correlations
            .lock()
            .expect("correlation mutex poisoned");
        *correlations = CorrelationSet::default();
        for record in records {
            correlations.record(&record.correlation_id, record.first_seen_at);
        }
    }

    /// Record one session start for usage-pattern risk; returns the
    /// number of starts inside the window, this one included.
    fn note_session_start(&self, owner: &str, now: u64) -> usize {
        let cutoff = now.saturating_sub(self.settings.usage_window_secs);
        let mut recent = self.recent_starts.lock().expect("usage mutex poisoned");
        let starts = recent.entry(owner.to_string()).or_default();
        starts.retain(|t| *t >= cutoff);
        starts.push(now);
        starts.len()
    }
}

/// Per-scope sensitivity weight.
fn scope_weight(scope: &str) -> u8 {
    match scope {
        "wallet_admin" => 5,
        "wallet_transfer" => 3,
        "wallet_read" => 1,
        _ => 2,
    }
}

/// Combined scope sensitivity, capped at 10.
fn scope_risk(scopes: &[String]) -> u8 {
    scopes
        .iter()
        .map(|s| scope_weight(s) as u32)
        .sum::<u32>()
        .min(10) as u8
}

/// Minimum device trust to start a session without step-up proof.
fn required_trust(scopes: &[String]) -> u8 {
    let max_weight = scopes.iter().map(|s| scope_weight(s)).max().unwrap_or(0);
    match max_weight {
        0..=1 => 2,
        2..=3 => 5,
        _ => 8,
    }
}

/// Risk from how long the session is asked to live.
fn session_age_risk(ttl_secs: u64) -> u8 {
    match ttl_secs {
        0..=3_600 => 0,
        3_601..=86_400 => 2,
        _ => 4,
    }
}

/// Risk from session-start frequency inside the usage window.
fn usage_pattern_risk(starts_in_window: usize) -> u8 {
    match starts_in_window {
        0..=2 => 0,
        3..=5 => 2,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::device::DeviceKind;

    fn scopes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn manager_with_device(owner: &str, device_id: &str, proof: Option<&DeviceProof>) -> SessionManager {
        let manager = SessionManager::new(SessionSettings::default(), None);
        manager
            .devices()
            .register(owner, device_id, DeviceKind::Mobile, proof)
            .unwrap();
        manager
    }

    fn attestation() -> DeviceProof {
        DeviceProof::Attestation("platform-statement".into())
    }

    #[test]
    fn test_start_and_validate() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));
        let started = manager
            .start_session(
                "alice",
                "dev-1",
                &scopes(&["wallet_transfer"]),
                3600,
                "corr-1",
                None,
            )
            .unwrap();

        let outcome = manager.validate(
            &started.session_id.to_string(),
            "alice",
            &scopes(&["wallet_transfer"]),
        );
        assert!(outcome.valid);
        let remaining = outcome.remaining_ttl.unwrap();
        assert!(remaining > 3590 && remaining <= 3600);
        assert_eq!(outcome.risk_score, Some(started.risk_score));
    }

    #[test]
    fn test_replay_rejected() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));
        manager
            .start_session("alice", "dev-1", &scopes(&["wallet_read"]), 3600, "corr-1", None)
            .unwrap();

        let second = manager.start_session(
            "alice",
            "dev-1",
            &scopes(&["wallet_read"]),
            3600,
            "corr-1",
            None,
        );
        assert_eq!(second.unwrap_err(), StartError::ReplayDetected);
    }

    #[test]
    fn test_hijacked_token_rejected() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));
        let started = manager
            .start_session("alice", "dev-1", &scopes(&["wallet_read"]), 3600, "corr-1", None)
            .unwrap();

        // Correct scope, unexpired, but asserted by the wrong identity.
        let outcome = manager.validate(
            &started.session_id.to_string(),
            "mallory",
            &scopes(&["wallet_read"]),
        );
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, Some(SessionDenied::OwnerMismatch));
        assert!(outcome.remaining_ttl.is_none());
    }

    #[test]
    fn test_scope_subset_enforced() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));
        let started = manager
            .start_session("alice", "dev-1", &scopes(&["wallet_read"]), 3600, "corr-1", None)
            .unwrap();

        let outcome = manager.validate(
            &started.session_id.to_string(),
            "alice",
            &scopes(&["wallet_admin"]),
        );
        assert!(!outcome.valid);
        assert_eq!(
            outcome.reason,
            Some(SessionDenied::InsufficientScope {
                missing: "wallet_admin".into()
            })
        );

        // Subset of granted scopes passes.
        let outcome = manager.validate(&started.session_id.to_string(), "alice", &[]);
        assert!(outcome.valid);
    }

    #[test]
    fn test_expiry_is_terminal() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));
        let now = 1_700_000_000;
        let started = manager
            .start_session_at(
                "alice",
                "dev-1",
                &scopes(&["wallet_transfer"]),
                3600,
                "corr-1",
                None,
                now,
            )
            .unwrap();
        assert_eq!(started.expires_at, now + 3600);

        let id = started.session_id.to_string();
        let live = manager.validate_at(&id, "alice", &scopes(&["wallet_transfer"]), now + 10);
        assert!(live.valid);
        assert_eq!(live.remaining_ttl, Some(3590));

        // Boundary: now == expires_at still validates.
        assert!(manager
            .validate_at(&id, "alice", &scopes(&["wallet_transfer"]), now + 3600)
            .valid);

        let expired =
            manager.validate_at(&id, "alice", &scopes(&["wallet_transfer"]), now + 3601);
        assert!(!expired.valid);
        assert_eq!(expired.reason, Some(SessionDenied::Expired));
    }

    #[test]
    fn test_validation_order_owner_before_expiry_before_scope() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));
        let now = 1_700_000_000;
        let started = manager
            .start_session_at("alice", "dev-1", &scopes(&["wallet_read"]), 60, "corr-1", None, now)
            .unwrap();
        let id = started.session_id.to_string();

        // Wrong owner + expired + wrong scope: owner mismatch wins.
        let outcome = manager.validate_at(&id, "mallory", &scopes(&["wallet_admin"]), now + 999);
        assert_eq!(outcome.reason, Some(SessionDenied::OwnerMismatch));

        // Right owner, expired + wrong scope: expiry wins.
        let outcome = manager.validate_at(&id, "alice", &scopes(&["wallet_admin"]), now + 999);
        assert_eq!(outcome.reason, Some(SessionDenied::Expired));
    }

    #[test]
    fn test_unknown_and_malformed_fail_closed() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));

        let outcome = manager.validate(&Uuid::new_v4().to_string(), "alice", &[]);
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, Some(SessionDenied::UnknownSession));

        let outcome = manager.validate("not-a-uuid", "alice", &[]);
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, Some(SessionDenied::MalformedToken));
    }

    #[test]
    fn test_revocation_is_terminal() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));
        let started = manager
            .start_session("alice", "dev-1", &scopes(&["wallet_read"]), 3600, "corr-1", None)
            .unwrap();
        let id = started.session_id.to_string();

        // Only the owner may revoke.
        assert_eq!(
            manager.revoke(&id, "mallory"),
            Err(SessionDenied::OwnerMismatch)
        );

        assert_eq!(manager.revoke(&id, "alice"), Ok(true));
        // Idempotent.
        assert_eq!(manager.revoke(&id, "alice"), Ok(false));

        let outcome = manager.validate(&id, "alice", &scopes(&["wallet_read"]));
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, Some(SessionDenied::Revoked));
    }

    #[test]
    fn test_low_trust_requires_attestation_for_risky_scopes() {
        // Bare registration: trust 2.
        let manager = manager_with_device("alice", "dev-1", None);

        // Low-sensitivity scope is fine.
        manager
            .start_session("alice", "dev-1", &scopes(&["wallet_read"]), 600, "corr-1", None)
            .unwrap();

        // Transfer without proof is refused.
        let denied = manager.start_session(
            "alice",
            "dev-1",
            &scopes(&["wallet_transfer"]),
            600,
            "corr-2",
            None,
        );
        assert!(matches!(
            denied.unwrap_err(),
            StartError::Denied(SessionDenied::AttestationRequired { required: 5, trust: 2 })
        ));

        // Step-up proof at session start unlocks it.
        manager
            .start_session(
                "alice",
                "dev-1",
                &scopes(&["wallet_transfer"]),
                600,
                "corr-3",
                Some(&attestation()),
            )
            .unwrap();
    }

    #[test]
    fn test_unknown_device_and_foreign_device() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));

        let err = manager
            .start_session("alice", "ghost", &scopes(&["wallet_read"]), 600, "corr-1", None)
            .unwrap_err();
        assert_eq!(err, StartError::Denied(SessionDenied::UnknownDevice));

        let err = manager
            .start_session("mallory", "dev-1", &scopes(&["wallet_read"]), 600, "corr-2", None)
            .unwrap_err();
        assert_eq!(err, StartError::Denied(SessionDenied::DeviceNotOwned));
    }

    #[test]
    fn test_risk_score_components() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));
        let now = 1_700_000_000;

        // Trust 8: device component 2. wallet_read: scope 1. Short ttl,
        // first start in window: 0 + 0.
        let started = manager
            .start_session_at("alice", "dev-1", &scopes(&["wallet_read"]), 600, "c1", None, now)
            .unwrap();
        assert_eq!(started.risk_score, 3);

        // Long ttl adds age risk.
        let started = manager
            .start_session_at(
                "alice",
                "dev-1",
                &scopes(&["wallet_read"]),
                172_800,
                "c2",
                None,
                now,
            )
            .unwrap();
        assert_eq!(started.risk_score, 2 + 1 + 4);

        // Third start in the window pushes usage risk to the next tier.
        let started = manager
            .start_session_at("alice", "dev-1", &scopes(&["wallet_read"]), 600, "c3", None, now)
            .unwrap();
        assert_eq!(started.risk_score, 2 + 1 + 2);
    }

    #[test]
    fn test_ttl_cap_enforced() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));
        let err = manager
            .start_session(
                "alice",
                "dev-1",
                &scopes(&["wallet_read"]),
                1_000_000,
                "corr-1",
                None,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            StartError::Denied(SessionDenied::TtlTooLong { .. })
        ));
    }

    #[test]
    fn test_correlation_set_bounded() {
        let settings = SessionSettings {
            correlation_capacity: 3,
            ..SessionSettings::default()
        };
        let manager = SessionManager::new(settings, None);
        manager
            .devices()
            .register("alice", "dev-1", DeviceKind::Mobile, Some(&attestation()))
            .unwrap();

        for i in 0..5 {
            manager
                .start_session("alice", "dev-1", &scopes(&["wallet_read"]), 600, &format!("c{i}"), None)
                .unwrap();
        }
        // Oldest ids were pruned; only the newest 3 are remembered.
        assert_eq!(manager.export_correlations().len(), 3);
    }

    #[test]
    fn test_prune_drops_terminated_sessions() {
        let manager = manager_with_device("alice", "dev-1", Some(&attestation()));
        let now = 1_700_000_000;
        let short = manager
            .start_session_at("alice", "dev-1", &scopes(&["wallet_read"]), 60, "c1", None, now)
            .unwrap();
        let long = manager
            .start_session_at("alice", "dev-1", &scopes(&["wallet_read"]), 3600, "c2", None, now)
            .unwrap();

        manager.prune_expired(now + 120);
        assert!(!manager
            .validate_at(&short.session_id.to_string(), "alice", &[], now + 120)
            .valid);
        assert!(manager
            .validate_at(&long.session_id.to_string(), "alice", &[], now + 120)
            .valid);
    }
}
