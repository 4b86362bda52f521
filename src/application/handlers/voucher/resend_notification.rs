//! ResendNotificationHandler - operator-triggered credentials resend.

use std::sync::Arc;
use tracing::info;

use crate::application::notification::NotificationDispatcher;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::voucher::{Voucher, VoucherCode, VoucherStatus};
use crate::ports::{NotificationKind, VoucherRepository};

/// Command to resend the credentials SMS for an active voucher.
#[derive(Debug, Clone)]
pub struct ResendNotificationCommand {
    pub code: VoucherCode,
}

/// Handler for credential resends.
///
/// Resending only makes sense while the voucher is usable; anything
/// else would text credentials that no longer work.
pub struct ResendNotificationHandler {
    vouchers: Arc<dyn VoucherRepository>,
    notifier: Arc<NotificationDispatcher>,
}

impl ResendNotificationHandler {
    pub fn new(
        vouchers: Arc<dyn VoucherRepository>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        Self { vouchers, notifier }
    }

    pub async fn handle(&self, cmd: ResendNotificationCommand) -> Result<Voucher, DomainError> {
        let voucher = self
            .vouchers
            .find_by_code(&cmd.code)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::VoucherNotFound, "Voucher not found")
                    .with_detail("code", cmd.code.to_string())
            })?;

        if voucher.status != VoucherStatus::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Only active vouchers can have credentials resent",
            )
            .with_detail("status", format!("{:?}", voucher.status)));
        }

        let voucher = self
            .notifier
            .resend(&voucher, NotificationKind::Activated)
            .await?;

        info!(voucher = %voucher.code, "credentials resent");
        Ok(voucher)
    }
}
