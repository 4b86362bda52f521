//! Notification sender port.
//!
//! The outbound SMS channel. Implementations talk to a gateway; the
//! dispatcher owns dedup and persistence of the send record.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::PhoneNumber;

/// A gateway's acknowledgement of an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Gateway-assigned message id, when reported.
    pub message_id: Option<String>,
}

/// Errors from the SMS channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// The gateway could not be reached or timed out.
    #[error("sms gateway unreachable: {0}")]
    GatewayUnreachable(String),

    /// The gateway rejected the message outright.
    #[error("sms gateway rejected message: {0}")]
    Rejected(String),
}

impl NotificationError {
    /// Transport failures may be retried; rejections will not improve.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotificationError::GatewayUnreachable(_))
    }
}

/// Port for sending SMS messages.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends one message. Returns only after the gateway accepted it.
    async fn send(
        &self,
        recipient: &PhoneNumber,
        body: &str,
    ) -> Result<SendReceipt, NotificationError>;
}
