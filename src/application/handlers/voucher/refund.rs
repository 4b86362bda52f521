//! RefundVoucherHandler - refund an active voucher and revoke access.
//!
//! Ordering matters here: the status transition is persisted first and
//! its conditional update decides any race (a sweeper expiring the same
//! voucher, a concurrent disable). Only the race winner touches money.
//! Payment reversal and router cleanup then run best-effort; a gateway
//! hiccup leaves the voucher refunded with the reversal flagged in logs
//! for reconciliation, it never double-charges or resurrects access.

use std::sync::Arc;
use tracing::{info, warn};

use crate::application::notification::NotificationDispatcher;
use crate::application::provisioning::ProvisioningCoordinator;
use crate::domain::foundation::{DomainError, ErrorCode, VoucherId};
use crate::domain::voucher::{Voucher, VoucherEvent};
use crate::ports::{
    DeviceRepository, NotificationKind, PaymentGateway, PaymentRepository, PaymentState,
    VoucherRepository,
};

/// Command to refund a voucher.
#[derive(Debug, Clone)]
pub struct RefundVoucherCommand {
    pub voucher_id: VoucherId,
    pub reason: String,
}

/// Result of a refund.
#[derive(Debug, Clone)]
pub struct RefundVoucherResult {
    pub voucher: Voucher,
    /// False when the payment reversal needs manual reconciliation.
    pub payment_reversed: bool,
}

/// Handler for voucher refunds.
pub struct RefundVoucherHandler {
    vouchers: Arc<dyn VoucherRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    devices: Arc<dyn DeviceRepository>,
    coordinator: Arc<ProvisioningCoordinator>,
    notifier: Arc<NotificationDispatcher>,
}

impl RefundVoucherHandler {
    pub fn new(
        vouchers: Arc<dyn VoucherRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        devices: Arc<dyn DeviceRepository>,
        coordinator: Arc<ProvisioningCoordinator>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            vouchers,
            payments,
            gateway,
            devices,
            coordinator,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: RefundVoucherCommand,
    ) -> Result<RefundVoucherResult, DomainError> {
        let mut voucher = self
            .vouchers
            .find_by_id(&cmd.voucher_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::VoucherNotFound, "Voucher not found")
                    .with_detail("voucher_id", cmd.voucher_id.to_string())
            })?;

        // 1. Win the state race before touching money.
        let applied = voucher.apply(&VoucherEvent::RefundRequested {
            reason: cmd.reason.clone(),
        })?;
        if !applied.is_transition() {
            info!(voucher = %voucher.code, "refund already processed");
            return Ok(RefundVoucherResult {
                voucher,
                payment_reversed: true,
            });
        }
        let voucher = self.vouchers.update(&voucher).await?;

        // 2. Reverse the payment.
        let payment_reversed = self.reverse_payment(&voucher).await;

        // 3. Revoke router access.
        self.deprovision_best_effort(&voucher).await;

        // 4. Tell the customer.
        let voucher = match self
            .notifier
            .dispatch(&voucher, NotificationKind::Refunded)
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                warn!(voucher = %voucher.code, error = %err, "refund sms failed");
                voucher
            }
        };

        info!(
            voucher = %voucher.code,
            reason = %cmd.reason,
            payment_reversed,
            "voucher refunded"
        );
        Ok(RefundVoucherResult {
            voucher,
            payment_reversed,
        })
    }

    async fn reverse_payment(&self, voucher: &Voucher) -> bool {
        let Some(payment_id) = voucher.payment_id else {
            // Manually issued vouchers have no money attached.
            return true;
        };
        let payment = match self.payments.find_by_id(&payment_id).await {
            Ok(Some(payment)) => payment,
            Ok(None) => {
                warn!(voucher = %voucher.code, %payment_id, "payment record missing");
                return false;
            }
            Err(err) => {
                warn!(voucher = %voucher.code, error = %err, "payment lookup failed");
                return false;
            }
        };

        if let Err(err) = self.gateway.reverse_payment(&payment.reference).await {
            warn!(
                voucher = %voucher.code,
                reference = %payment.reference,
                error = %err,
                "payment reversal failed, reconcile manually"
            );
            return false;
        }

        if let Err(err) = self
            .payments
            .update_state(&payment_id, PaymentState::Reversed)
            .await
        {
            warn!(voucher = %voucher.code, error = %err, "payment state update failed");
            return false;
        }
        true
    }

    async fn deprovision_best_effort(&self, voucher: &Voucher) {
        let Some(device_id) = voucher.device_id else {
            return;
        };
        match self.devices.find_by_id(&device_id).await {
            Ok(Some(device)) => {
                if let Err(err) = self.coordinator.deprovision(voucher, &device).await {
                    warn!(
                        voucher = %voucher.code,
                        device = %device.name,
                        error = %err,
                        "router cleanup failed after refund"
                    );
                }
            }
            Ok(None) => {
                warn!(voucher = %voucher.code, %device_id, "device gone, skipping cleanup");
            }
            Err(err) => {
                warn!(voucher = %voucher.code, error = %err, "device lookup failed");
            }
        }
    }
}
