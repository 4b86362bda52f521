//! E.164 phone number value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A phone number in E.164 form: `+` followed by 8 to 15 digits.
///
/// All SMS delivery goes through this type, so a voucher can only ever be
/// associated with a number the gateway can actually address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses a phone number, tolerating spaces, dashes, and parentheses.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();

        if cleaned.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "phone_number".to_string(),
            });
        }

        let digits = match cleaned.strip_prefix('+') {
            Some(rest) => rest,
            None => {
                return Err(ValidationError::InvalidFormat {
                    field: "phone_number".to_string(),
                    reason: "E.164 format starting with '+'".to_string(),
                })
            }
        };

        if digits.len() < 8 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidFormat {
                field: "phone_number".to_string(),
                reason: "'+' followed by 8-15 digits".to_string(),
            });
        }

        Ok(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
