//! Device registration and trust assignment.
//!
//! Devices persist independent of sessions: a registered device survives
//! every session issued from it. The trust level (0-10) assigned at
//! registration drives proof requirements and risk scoring at session
//! start.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::observability::metrics;

/// What kind of device is being registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Browser,
    Mobile,
    Hardware,
    Service,
}

/// Proof of possession presented at registration or session start.
///
/// Attestation (platform/hardware-backed statement) is stronger evidence
/// than a bare public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProof {
    Attestation(String),
    PublicKey(String),
}

/// A registered device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub owner: String,
    pub kind: DeviceKind,
    /// 0-10; higher means stronger registration evidence.
    pub trust_level: u8,
    /// Seconds since epoch.
    pub registered_at: u64,
}

/// Thread-safe device registry keyed by device id.
#[derive(Clone, Default)]
pub struct DeviceRegistry {
    inner: Arc<DashMap<String, Device>>,
}

/// Why a device registration was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    /// The device id is already registered to a different identity.
    #[error("device is registered to another identity")]
    OwnedByOther,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, assigning trust from proof strength.
    ///
    /// Re-registration by the same owner refreshes the proof; trust is
    /// never silently lowered below what stronger past evidence earned.
    pub fn register(
        &self,
        owner: &str,
        device_id: &str,
        kind: DeviceKind,
        proof: Option<&DeviceProof>,
    ) -> Result<u8, RegisterError> {
        let assigned = trust_level(kind, proof);

        if let Some(existing) = self.inner.get(device_id) {
            if existing.owner != owner {
                tracing::warn!(device_id, "Device registration refused: owner mismatch");
                return Err(RegisterError::OwnedByOther);
            }
        }

        let mut trust = assigned;
        self.inner
            .entry(device_id.to_string())
            .and_modify(|d| {
                trust = assigned.max(d.trust_level);
                d.kind = kind;
                d.trust_level = trust;
            })
            .or_insert_with(|| Device {
                device_id: device_id.to_string(),
                owner: owner.to_string(),
                kind,
                trust_level: assigned,
                registered_at: unix_now_secs(),
            });

        tracing::info!(device_id, owner, trust, "Device registered");
        metrics::record_session_event("device_registered");
        Ok(trust)
    }

    pub fn get(&self, device_id: &str) -> Option<Device> {
        self.inner.get(device_id).map(|d| d.value().clone())
    }

    pub fn count(&self) -> usize {
        self.inner.len()
    }

    /// All devices, for persistence.
    pub fn export(&self) -> Vec<Device> {
        self.inner.iter().map(|d| d.value().clone()).collect()
    }

    /// Replace the registry contents, for restore on startup.
    pub fn import(&self, devices: Vec<Device>) {
        self.inner.clear();
        for device in devices {
            self.inner.insert(device.device_id.clone(), device);
        }
    }
}

/// Trust from proof strength, adjusted by device kind, clamped to 0-10.
fn trust_level(kind: DeviceKind, proof: Option<&DeviceProof>) -> u8 {
    let base: i8 = match proof {
        Some(DeviceProof::Attestation(_)) => 8,
        Some(DeviceProof::PublicKey(_)) => 5,
        None => 2,
    };
    let adjustment: i8 = match kind {
        DeviceKind::Hardware => 1,
        DeviceKind::Mobile | DeviceKind::Service => 0,
        DeviceKind::Browser => -1,
    };
    (base + adjustment).clamp(0, 10) as u8
}

pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
