//! HTTP SMS gateway adapter.
//!
//! Posts JSON to a bulk-SMS gateway. The gateway's 2xx acknowledgement is
//! the delivery confirmation the dispatcher records; anything else is a
//! send failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::SmsConfig;
use crate::domain::foundation::PhoneNumber;
use crate::ports::{NotificationError, NotificationSender, SendReceipt};

/// HTTP implementation of the NotificationSender port.
pub struct HttpSmsSender {
    http_client: reqwest::Client,
    config: SmsConfig,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    from: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    message_id: Option<String>,
}

impl HttpSmsSender {
    pub fn new(config: SmsConfig) -> Result<Self, NotificationError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotificationError::GatewayUnreachable(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }
}

#[async_trait]
impl NotificationSender for HttpSmsSender {
    async fn send(
        &self,
        recipient: &PhoneNumber,
        body: &str,
    ) -> Result<SendReceipt, NotificationError> {
        let request = SendRequest {
            to: recipient.as_str(),
            from: &self.config.sender_id,
            message: body,
        };

        let response = self
            .http_client
            .post(&self.config.gateway_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    NotificationError::GatewayUnreachable(e.to_string())
                } else {
                    NotificationError::Rejected(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(NotificationError::GatewayUnreachable(format!(
                    "{status}: {detail}"
                )));
            }
            return Err(NotificationError::Rejected(format!("{status}: {detail}")));
        }

        let parsed: SendResponse = response
            .json()
            .await
            .unwrap_or(SendResponse { message_id: None });

        debug!(to = %recipient, message_id = ?parsed.message_id, "sms accepted by gateway");

        Ok(SendReceipt {
            message_id: parsed.message_id,
        })
    }
}
