//! Notification log port.
//!
//! Durable dedup ledger for outbound customer notifications. A message is
//! recorded only after the gateway accepted it, and the dispatcher checks
//! this log before every send, so a replayed webhook or a sweeper re-run
//! never texts a customer twice for the same transition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp, VoucherId};

/// The voucher transition a notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Credentials delivered after successful provisioning.
    Activated,
    /// The voucher lapsed and access was removed.
    Expired,
    /// The voucher was refunded.
    Refunded,
    /// Replacement credentials after a transfer.
    Transferred,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Activated => "activated",
            NotificationKind::Expired => "expired",
            NotificationKind::Refunded => "refunded",
            NotificationKind::Transferred => "transferred",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One confirmed-sent notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub voucher_id: VoucherId,
    pub kind: NotificationKind,
    pub recipient: String,
    pub sent_at: Timestamp,
    /// Gateway message id, when the gateway reports one.
    pub gateway_message_id: Option<String>,
}

/// Port for the notification dedup ledger.
#[async_trait]
pub trait NotificationLog: Send + Sync {
    /// Whether a notification of this kind was already sent for the voucher.
    async fn contains(
        &self,
        voucher_id: &VoucherId,
        kind: NotificationKind,
    ) -> Result<bool, DomainError>;

    /// Records a confirmed send. Recording the same (voucher, kind) pair
    /// twice is a no-op, not an error.
    async fn record(&self, record: &NotificationRecord) -> Result<(), DomainError>;
}
