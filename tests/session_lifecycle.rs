//! Session lifecycle properties exercised through the gateway façade.

use admission_gateway::admission::{AdmissionError, AdmissionGateway};
use admission_gateway::session::{
    DeviceKind, DeviceProof, SessionDenied, SessionManager, SessionSettings,
};

mod common;

fn scopes(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_replay_rejected_on_second_start() {
    let gateway = AdmissionGateway::new(&common::test_config());
    common::issue_session(&gateway, "acct-1", &["wallet_read"], "corr-once");

    let second = gateway.start_session(
        "acct-1",
        "test-device",
        &scopes(&["wallet_read"]),
        3600,
        "corr-once",
        None,
    );
    assert_eq!(second.unwrap_err(), AdmissionError::ReplayDetected);
}

#[test]
fn test_hijacked_token_fails_validation() {
    let gateway = AdmissionGateway::new(&common::test_config());
    let session = common::issue_session(&gateway, "acct-a", &["wallet_read"], "corr-hijack");

    // Identity B asserts A's syntactically valid, unexpired token.
    let outcome = gateway.validate_session(&session, "acct-b", &scopes(&["wallet_read"]));
    assert!(!outcome.valid);

    // The rightful owner still validates.
    assert!(gateway
        .validate_session(&session, "acct-a", &scopes(&["wallet_read"]))
        .valid);
}

#[test]
fn test_scope_widening_refused() {
    let gateway = AdmissionGateway::new(&common::test_config());
    let session = common::issue_session(&gateway, "acct-1", &["wallet_read"], "corr-scope");

    let outcome = gateway.validate_session(&session, "acct-1", &scopes(&["wallet_admin"]));
    assert!(!outcome.valid);
}

#[test]
fn test_ttl_example_flow() {
    let gateway = AdmissionGateway::new(&common::test_config());
    let session = common::issue_session(&gateway, "acct-1", &["wallet_transfer"], "corr-ttl");

    // Immediate validation: valid, remaining ttl ~3600.
    let outcome = gateway.validate_session(&session, "acct-1", &scopes(&["wallet_transfer"]));
    assert!(outcome.valid);
    let remaining = outcome.remaining_ttl.unwrap();
    assert!(remaining > 3590 && remaining <= 3600);
    assert!(outcome.risk_score.is_some());

    // Simulated elapse beyond the ttl: terminated.
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let outcome = gateway.sessions().validate_at(
        &session,
        "acct-1",
        &scopes(&["wallet_transfer"]),
        now + 3601,
    );
    assert!(!outcome.valid);
    assert_eq!(outcome.reason, Some(SessionDenied::Expired));
}

#[test]
fn test_attestation_policy_through_facade() {
    let gateway = AdmissionGateway::new(&common::test_config());
    // Bare registration: no proof at all.
    gateway
        .register_device("acct-1", "weak-dev", DeviceKind::Browser, None)
        .unwrap();

    let denied = gateway.start_session(
        "acct-1",
        "weak-dev",
        &scopes(&["wallet_admin"]),
        600,
        "corr-att-1",
        None,
    );
    assert!(matches!(
        denied.unwrap_err(),
        AdmissionError::Unauthorized(SessionDenied::AttestationRequired { .. })
    ));

    // Step-up attestation at session start is accepted.
    gateway
        .start_session(
            "acct-1",
            "weak-dev",
            &scopes(&["wallet_admin"]),
            600,
            "corr-att-2",
            Some(&DeviceProof::Attestation("step-up".into())),
        )
        .unwrap();
}

#[test]
fn test_state_survives_restart() {
    let path = "test_gateway_restart_state.json";
    let _ = std::fs::remove_file(path);

    let mut config = common::test_config();
    config.persistence.enabled = true;
    config.persistence.path = path.to_string();

    let gateway = AdmissionGateway::new(&config);
    let session = common::issue_session(&gateway, "acct-1", &["wallet_transfer"], "corr-persist");
    gateway.sessions().save_to_file().unwrap();

    // Simulated restart: a fresh gateway restores the snapshot.
    let restored = SessionManager::load_from_file(
        path,
        admission_gateway::admission::settings_from(&config),
    )
    .unwrap();
    let gateway = AdmissionGateway::with_sessions(&config, restored);

    assert!(gateway
        .validate_session(&session, "acct-1", &scopes(&["wallet_transfer"]))
        .valid);

    // Replay protection also survives.
    let replay = gateway.start_session(
        "acct-1",
        "test-device",
        &scopes(&["wallet_read"]),
        600,
        "corr-persist",
        None,
    );
    assert_eq!(replay.unwrap_err(), AdmissionError::ReplayDetected);

    std::fs::remove_file(path).unwrap_or_default();
}

#[test]
fn test_settings_defaults_are_sane() {
    let settings = SessionSettings::default();
    assert!(settings.max_ttl_secs >= 3600);
    assert!(settings.correlation_capacity >= 1000);
}
