//! NotificationDispatcher - deduplicated customer SMS delivery.
//!
//! One notification per (voucher, transition), enforced by the durable
//! notification log. `sms_sent_at` is only ever set after the gateway
//! confirmed acceptance; a failed send leaves no trace except logs, so
//! the next attempt (sweeper or explicit resend) starts clean.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::voucher::Voucher;
use crate::ports::{
    Customer, CustomerDirectory, NotificationKind, NotificationLog, NotificationRecord,
    NotificationSender, VoucherRepository,
};

/// Sends lifecycle SMS messages to voucher owners.
pub struct NotificationDispatcher {
    customers: Arc<dyn CustomerDirectory>,
    sender: Arc<dyn NotificationSender>,
    log: Arc<dyn NotificationLog>,
    vouchers: Arc<dyn VoucherRepository>,
}

impl NotificationDispatcher {
    pub fn new(
        customers: Arc<dyn CustomerDirectory>,
        sender: Arc<dyn NotificationSender>,
        log: Arc<dyn NotificationLog>,
        vouchers: Arc<dyn VoucherRepository>,
    ) -> Self {
        Self {
            customers,
            sender,
            log,
            vouchers,
        }
    }

    /// Sends the notification for a transition unless one was already
    /// delivered. Returns the voucher, stamped with `sms_sent_at` when
    /// this call (not a previous one) confirmed a send.
    pub async fn dispatch(
        &self,
        voucher: &Voucher,
        kind: NotificationKind,
    ) -> Result<Voucher, DomainError> {
        if self.log.contains(&voucher.id, kind).await? {
            info!(voucher = %voucher.code, %kind, "notification already sent, skipping");
            return Ok(voucher.clone());
        }

        self.send_and_record(voucher, kind).await
    }

    /// Sends regardless of the dedup ledger (operator-requested resend).
    pub async fn resend(
        &self,
        voucher: &Voucher,
        kind: NotificationKind,
    ) -> Result<Voucher, DomainError> {
        self.send_and_record(voucher, kind).await
    }

    async fn send_and_record(
        &self,
        voucher: &Voucher,
        kind: NotificationKind,
    ) -> Result<Voucher, DomainError> {
        let customer = self
            .customers
            .find_by_id(&voucher.customer_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::CustomerNotFound, "Voucher owner not found")
                    .with_detail("customer_id", voucher.customer_id.to_string())
            })?;

        let body = compose_message(voucher, &customer, kind);

        let receipt = self
            .sender
            .send(&customer.phone, &body)
            .await
            .map_err(|e| {
                warn!(voucher = %voucher.code, %kind, error = %e, "sms send failed");
                DomainError::new(ErrorCode::NotificationError, e.to_string())
            })?;

        let now = Timestamp::now();
        self.log
            .record(&NotificationRecord {
                voucher_id: voucher.id,
                kind,
                recipient: customer.phone.to_string(),
                sent_at: now,
                gateway_message_id: receipt.message_id,
            })
            .await?;

        let mut updated = voucher.clone();
        updated.mark_notified(now);
        let updated = self.vouchers.update(&updated).await?;

        info!(voucher = %voucher.code, %kind, to = %customer.phone, "notification sent");
        Ok(updated)
    }
}

fn compose_message(voucher: &Voucher, customer: &Customer, kind: NotificationKind) -> String {
    match kind {
        NotificationKind::Activated => format!(
            "Hi {}, your internet voucher is active. Login: {} Password: {}. \
             Plan {} is valid for {}h.",
            customer.name,
            voucher.code,
            voucher.password.as_str(),
            voucher.profile,
            voucher.validity_hours,
        ),
        NotificationKind::Expired => format!(
            "Hi {}, your voucher {} has expired. Buy a new voucher to get back online.",
            customer.name, voucher.code,
        ),
        NotificationKind::Refunded => format!(
            "Hi {}, your voucher {} has been refunded and deactivated.",
            customer.name, voucher.code,
        ),
        NotificationKind::Transferred => format!(
            "Hi {}, a voucher was transferred to you. Login: {} Password: {}. \
             Plan {} is valid for {}h.",
            customer.name,
            voucher.code,
            voucher.password.as_str(),
            voucher.profile,
            voucher.validity_hours,
        ),
    }
}
