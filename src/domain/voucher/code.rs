//! Voucher code and password value objects.
//!
//! The code doubles as the hotspot username on the router, so format rules
//! here are also RouterOS compatibility rules.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// Characters used in generated code groups. Excludes 0/O, 1/I and vowels
/// to keep codes unambiguous when read over the phone.
const CODE_ALPHABET: &[u8] = b"23456789BCDFGHJKLMNPQRSTVWXZ";

/// Human-readable voucher code, e.g. `BIL-AB12-CD34`.
///
/// Unique per voucher and used verbatim as the hotspot username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoucherCode(String);

impl VoucherCode {
    /// Parses and validates an existing code.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into().trim().to_uppercase();
        let parts: Vec<&str> = raw.split('-').collect();
        let valid = parts.len() == 3
            && parts[0] == "BIL"
            && parts[1].len() == 4
            && parts[2].len() == 4
            && parts[1..]
                .iter()
                .all(|p| p.chars().all(|c| c.is_ascii_alphanumeric()));
        if !valid {
            return Err(ValidationError::invalid_format(
                "voucher_code",
                "expected BIL-XXXX-XXXX",
            ));
        }
        Ok(Self(raw))
    }

    /// Generates a fresh random code.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut group = || -> String {
            (0..4)
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect()
        };
        Self(format!("BIL-{}-{}", group(), group()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric voucher password, delivered to the customer over SMS and used as
/// the hotspot password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoucherPassword(String);

impl VoucherPassword {
    /// Parses and validates an existing password (6-8 digits).
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.len() < 6 || raw.len() > 8 || !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid_format(
                "voucher_password",
                "expected 6-8 digits",
            ));
        }
        Ok(Self(raw))
    }

    /// Generates a fresh random 6-digit password.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self(format!("{:06}", rng.gen_range(0..1_000_000u32)))
    }

    /// Returns the password as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
