//! Credential encryption configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Configuration for encrypting router credentials at rest.
#[derive(Clone, Deserialize)]
pub struct SecurityConfig {
    /// 32-byte AES-256 key, hex encoded (64 characters)
    pub credential_key: SecretString,
}

impl SecurityConfig {
    /// Decode the credential key into raw bytes.
    pub fn key_bytes(&self) -> Result<[u8; 32], ValidationError> {
        let hex = self.credential_key.expose_secret();
        if hex.len() != 64 {
            return Err(ValidationError::InvalidCredentialKey);
        }
        let mut out = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk).map_err(|_| ValidationError::InvalidCredentialKey)?;
            out[i] = u8::from_str_radix(s, 16).map_err(|_| ValidationError::InvalidCredentialKey)?;
        }
        Ok(out)
    }

    /// Validate security configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.key_bytes().map(|_| ())
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("credential_key", &"[REDACTED]")
            .finish()
    }
}
