//! Session state persistence.
//!
//! JSON snapshot of the device registry, active sessions, and the
//! correlation set, written on graceful shutdown and loaded on startup.
//! The tracker's sample window and rate-limit counters are intentionally
//! not persisted: they rebuild from live traffic, an acceptable loss on
//! restart.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::session::device::{unix_now_secs, Device};
use crate::session::manager::{CorrelationRecord, Session, SessionManager, SessionSettings};

/// On-disk snapshot format.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub devices: Vec<Device>,
    pub sessions: Vec<Session>,
    pub correlations: Vec<CorrelationRecord>,
}

impl SessionManager {
    /// Load a manager from a snapshot file, if one exists.
    ///
    /// Sessions that expired or were revoked while the gateway was down
    /// are dropped on load; they are terminated, not resurrectable.
    pub fn load_from_file(path: &str, settings: SessionSettings) -> std::io::Result<Self> {
        let manager = SessionManager::new(settings, Some(path.to_string()));
        if Path::new(path).exists() {
            let file = File::open(path)?;
            let reader = BufReader::new(file);
            let state: PersistedState = serde_json::from_reader(reader)?;

            let now = unix_now_secs();
            let live: Vec<Session> = state
                .sessions
                .into_iter()
                .filter(|s| s.revoked_at.is_none() && now <= s.expires_at)
                .collect();

            tracing::info!(
                devices = state.devices.len(),
                sessions = live.len(),
                correlations = state.correlations.len(),
                "Loaded session state from snapshot"
            );

            manager.devices().import(state.devices);
            manager.import_sessions(live);
            manager.import_correlations(state.correlations);
        }
        Ok(manager)
    }

    /// Write the current state to the configured snapshot path.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let state = PersistedState {
                devices: self.devices().export(),
                sessions: self.export_sessions(),
                correlations: self.export_correlations(),
            };

            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer(writer, &state)?;
            tracing::info!(
                path = %path,
                sessions = state.sessions.len(),
                "Saved session state snapshot"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::device::{DeviceKind, DeviceProof};

    #[test]
    fn test_persistence_round_trip() {
        let path = "test_session_state_roundtrip.json";

        let manager =
            SessionManager::load_from_file(path, SessionSettings::default()).unwrap();
        manager
            .devices()
            .register(
                "alice",
                "dev-1",
                DeviceKind::Hardware,
                Some(&DeviceProof::Attestation("att".into())),
            )
            .unwrap();
        let started = manager
            .start_session(
                "alice",
                "dev-1",
                &["wallet_transfer".to_string()],
                3600,
                "corr-1",
                None,
            )
            .unwrap();
        manager.save_to_file().unwrap();

        let loaded = SessionManager::load_from_file(path, SessionSettings::default()).unwrap();
        assert_eq!(loaded.devices().count(), 1);
        assert!(loaded
            .validate(
                &started.session_id.to_string(),
                "alice",
                &["wallet_transfer".to_string()]
            )
            .valid);

        // Correlation replay survives the restart.
        let replay = loaded.start_session(
            "alice",
            "dev-1",
            &["wallet_read".to_string()],
            600,
            "corr-1",
            None,
        );
        assert!(replay.is_err());

        std::fs::remove_file(path).unwrap_or_default();
    }

    #[test]
    fn test_expired_sessions_dropped_on_load() {
        let path = "test_session_state_expired.json";

        let manager =
            SessionManager::load_from_file(path, SessionSettings::default()).unwrap();
        manager
            .devices()
            .register(
                "alice",
                "dev-1",
                DeviceKind::Mobile,
                Some(&DeviceProof::Attestation("att".into())),
            )
            .unwrap();

        // Already expired when written.
        let past = unix_now_secs() - 7200;
        let expired = manager
            .start_session_at(
                "alice",
                "dev-1",
                &["wallet_read".to_string()],
                3600,
                "corr-old",
                None,
                past,
            )
            .unwrap();
        let live = manager
            .start_session(
                "alice",
                "dev-1",
                &["wallet_read".to_string()],
                3600,
                "corr-new",
                None,
            )
            .unwrap();
        manager.save_to_file().unwrap();

        let loaded = SessionManager::load_from_file(path, SessionSettings::default()).unwrap();
        assert!(!loaded
            .validate(&expired.session_id.to_string(), "alice", &[])
            .valid);
        assert!(loaded
            .validate(&live.session_id.to_string(), "alice", &[])
            .valid);

        std::fs::remove_file(path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let manager =
            SessionManager::load_from_file("does_not_exist_12345.json", SessionSettings::default())
                .unwrap();
        assert_eq!(manager.devices().count(), 0);
        assert_eq!(manager.active_session_count(), 0);
    }
}
