//! Device configuration input and validation.
//!
//! Raw configuration (from an admin request or env) is validated into
//! [`ValidatedDeviceConfig`] before any persistence or connectivity test;
//! malformed input never reaches the repository or the wire.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::net::IpAddr;

use crate::domain::foundation::ValidationError;

/// Raw device configuration as submitted by an operator.
#[derive(Clone, Deserialize)]
pub struct DeviceConfig {
    /// Unique device name.
    pub name: String,

    /// Management IP address (parsed during validation).
    pub ip_address: String,

    /// RouterOS API port.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// API username.
    pub username: String,

    /// API password.
    pub password: SecretString,
}

impl DeviceConfig {
    pub fn new(
        name: impl Into<String>,
        ip_address: impl Into<String>,
        api_port: u16,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            name: name.into(),
            ip_address: ip_address.into(),
            api_port,
            username: username.into(),
            password,
        }
    }

    /// Validates every field, parsing the IP address.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found; nothing is persisted on
    /// failure.
    pub fn validate(self) -> Result<ValidatedDeviceConfig, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if name.len() > 64 {
            return Err(ValidationError::out_of_range(
                "name",
                1,
                64,
                name.len() as i64,
            ));
        }

        let ip_address: IpAddr = self.ip_address.trim().parse().map_err(|_| {
            ValidationError::invalid_format("ip_address", "not a valid IPv4/IPv6 address")
        })?;

        if self.api_port == 0 {
            return Err(ValidationError::out_of_range("api_port", 1, 65_535, 0));
        }

        if self.username.trim().is_empty() {
            return Err(ValidationError::empty_field("username"));
        }

        if self.password.expose_secret().is_empty() {
            return Err(ValidationError::empty_field("password"));
        }

        Ok(ValidatedDeviceConfig {
            name,
            ip_address,
            api_port: self.api_port,
            username: self.username.trim().to_string(),
            password: self.password,
        })
    }
}

impl std::fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("name", &self.name)
            .field("ip_address", &self.ip_address)
            .field("api_port", &self.api_port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Device configuration that passed validation.
#[derive(Clone)]
pub struct ValidatedDeviceConfig {
    pub name: String,
    pub ip_address: IpAddr,
    pub api_port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Partial update to an existing device. `None` fields are left untouched;
/// present fields are validated with the same rules as creation.
#[derive(Clone, Default, Deserialize)]
pub struct DevicePatch {
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub api_port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl DevicePatch {
    /// True if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.ip_address.is_none()
            && self.api_port.is_none()
            && self.username.is_none()
            && self.password.is_none()
    }
}

impl std::fmt::Debug for DevicePatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevicePatch")
            .field("name", &self.name)
            .field("ip_address", &self.ip_address)
            .field("api_port", &self.api_port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn default_api_port() -> u16 {
    8728
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> DeviceConfig {
        DeviceConfig::new(
            "gateway-01",
            "192.168.88.1",
            8728,
            "api-user",
            SecretString::new("pw".to_string()),
        )
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        let valid = raw().validate().unwrap();
        assert_eq!(valid.name, "gateway-01");
        assert_eq!(valid.ip_address.to_string(), "192.168.88.1");
    }

    #[test]
    fn validate_trims_name_and_rejects_empty() {
        let mut config = raw();
        config.name = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_ip() {
        let mut config = raw();
        config.ip_address = "999.1.2.3".to_string();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_port() {
        let mut config = raw();
        config.api_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_password() {
        let mut config = raw();
        config.password = SecretString::new(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_ipv6() {
        let mut config = raw();
        config.ip_address = "fd00::1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_never_prints_password() {
        let rendered = format!("{:?}", raw());
        assert!(!rendered.contains("pw\""));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(DevicePatch::default().is_empty());
        let patch = DevicePatch {
            api_port: Some(8729),
            ..DevicePatch::default()
        };
        assert!(!patch.is_empty());
    }
}
