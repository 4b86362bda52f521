//! SMS gateway configuration

use serde::Deserialize;

use super::error::ValidationError;

/// SMS gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    /// Gateway HTTP endpoint for sending messages
    pub gateway_url: String,

    /// API key for the gateway
    pub api_key: String,

    /// Alphanumeric sender id shown to recipients (max 11 chars per GSM spec)
    #[serde(default = "default_sender_id")]
    pub sender_id: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl SmsConfig {
    /// Validate SMS configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.gateway_url.is_empty() {
            return Err(ValidationError::MissingRequired("SMS_GATEWAY_URL"));
        }
        if !self.gateway_url.starts_with("http://") && !self.gateway_url.starts_with("https://") {
            return Err(ValidationError::InvalidSmsGatewayUrl);
        }
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingRequired("SMS_API_KEY"));
        }
        if self.sender_id.is_empty() || self.sender_id.len() > 11 {
            return Err(ValidationError::InvalidSmsSenderId);
        }
        Ok(())
    }
}

fn default_sender_id() -> String {
    "NETVEND".to_string()
}

fn default_timeout() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SmsConfig {
        SmsConfig {
            gateway_url: "https://sms.example.com/v1/send".to_string(),
            api_key: "key-123".to_string(),
            sender_id: default_sender_id(),
            timeout_secs: default_timeout(),
        }
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut config = valid();
        config.gateway_url = "ftp://sms.example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSmsGatewayUrl)
        ));
    }

    #[test]
    fn validate_rejects_long_sender_id() {
        let mut config = valid();
        config.sender_id = "WAYTOOLONGSENDER".to_string();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSmsSenderId)
        ));
    }
}
