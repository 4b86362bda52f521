//! RouterDevice aggregate entity.
//!
//! A RouterDevice is one managed MikroTik router reachable over the
//! RouterOS API. Credentials at rest are encrypted by the repository;
//! in memory the password lives in a [`secrecy::SecretString`] that is
//! excluded from every serialized representation and only obtainable
//! through the explicit [`RouterDevice::password`] accessor.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::domain::foundation::{DeviceId, Timestamp};

use super::ValidatedDeviceConfig;

/// Reachability status of a router device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Last health check or provisioning call succeeded.
    Online,

    /// Device could not be reached.
    Offline,

    /// Device reachable but refusing us (auth failure, protocol error).
    Error,
}

/// Password wrapper that never serializes and renders redacted.
#[derive(Clone, Default)]
pub struct DevicePassword(Option<SecretString>);

impl DevicePassword {
    pub fn new(secret: SecretString) -> Self {
        Self(Some(secret))
    }

    /// The decrypted password, if loaded. Repositories strip it before
    /// handing devices to read-only callers.
    pub fn secret(&self) -> Option<&SecretString> {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for DevicePassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for DevicePassword {
    // Presence only; secrets are never compared through the aggregate.
    fn eq(&self, other: &Self) -> bool {
        self.0.is_some() == other.0.is_some()
    }
}

/// RouterDevice aggregate.
///
/// # Invariants
///
/// - `name` and `ip_address` are unique across devices
/// - the password is absent from any serde representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterDevice {
    /// Unique identifier.
    pub id: DeviceId,

    /// Unique human-assigned name.
    pub name: String,

    /// Management IP address, unique across devices.
    pub ip_address: IpAddr,

    /// RouterOS API port (default 8728).
    pub api_port: u16,

    /// API username.
    pub username: String,

    /// API password; in-memory only, never serialized.
    #[serde(skip)]
    pub password: DevicePassword,

    /// Current reachability status.
    pub status: DeviceStatus,

    /// Last successful contact.
    pub last_seen: Option<Timestamp>,

    /// Uptime reported by the last health check.
    pub uptime_seconds: Option<u64>,

    /// Detail from the most recent failure.
    pub last_error: Option<String>,

    /// When the device was registered.
    pub created_at: Timestamp,

    /// When the device record was last updated.
    pub updated_at: Timestamp,
}

impl RouterDevice {
    /// Creates a device from validated configuration. New devices start
    /// offline until a health check proves otherwise.
    pub fn from_config(config: ValidatedDeviceConfig) -> Self {
        let now = Timestamp::now();
        Self {
            id: DeviceId::new(),
            name: config.name,
            ip_address: config.ip_address,
            api_port: config.api_port,
            username: config.username,
            password: DevicePassword::new(config.password),
            status: DeviceStatus::Offline,
            last_seen: None,
            uptime_seconds: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Explicit accessor for the decrypted password.
    pub fn password(&self) -> Option<&SecretString> {
        self.password.secret()
    }

    /// Records a successful contact with the device.
    pub fn mark_online(&mut self, at: Timestamp, uptime_seconds: Option<u64>) {
        self.status = DeviceStatus::Online;
        self.last_seen = Some(at);
        if uptime_seconds.is_some() {
            self.uptime_seconds = uptime_seconds;
        }
        self.last_error = None;
        self.updated_at = Timestamp::now();
    }

    /// Records an unreachable device.
    pub fn mark_offline(&mut self, reason: impl Into<String>) {
        self.status = DeviceStatus::Offline;
        self.last_error = Some(reason.into());
        self.updated_at = Timestamp::now();
    }

    /// Records a device that answered but rejected us.
    pub fn mark_error(&mut self, reason: impl Into<String>) {
        self.status = DeviceStatus::Error;
        self.last_error = Some(reason.into());
        self.updated_at = Timestamp::now();
    }

    /// `host:port` endpoint string for the API client.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.ip_address, self.api_port)
    }
}
