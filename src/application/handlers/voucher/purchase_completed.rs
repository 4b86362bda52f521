//! PurchaseCompletedHandler - mints and provisions a voucher for a
//! confirmed payment.
//!
//! This is the webhook entry point, so everything here must tolerate
//! replays: a duplicate callback finds the voucher already minted and
//! either returns it (already active) or retries the router work
//! (still pending). A retryable provisioning failure is not an error
//! at this level; the voucher stays pending and the sweeper owns the
//! retry schedule.

use std::sync::Arc;
use tracing::{info, warn};

use crate::application::notification::NotificationDispatcher;
use crate::application::provisioning::{ProvisioningCoordinator, ProvisionError};
use crate::domain::device::RouterDevice;
use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, Timestamp};
use crate::domain::voucher::{Voucher, VoucherEvent, VoucherSpec, VoucherStatus};
use crate::ports::{
    DeviceRepository, NotificationKind, PaymentRepository, VoucherRepository,
};

/// Command carrying the confirmed payment.
#[derive(Debug, Clone)]
pub struct PurchaseCompletedCommand {
    pub payment_id: PaymentId,
}

/// Result of processing a completed purchase.
#[derive(Debug, Clone)]
pub struct PurchaseCompletedResult {
    pub voucher: Voucher,
    /// True when this call (or a previous one) activated the voucher.
    /// False means the voucher is pending and the sweeper will retry.
    pub activated: bool,
}

/// Handler for payment-confirmed webhooks.
pub struct PurchaseCompletedHandler {
    vouchers: Arc<dyn VoucherRepository>,
    payments: Arc<dyn PaymentRepository>,
    devices: Arc<dyn DeviceRepository>,
    coordinator: Arc<ProvisioningCoordinator>,
    notifier: Arc<NotificationDispatcher>,
}

impl PurchaseCompletedHandler {
    pub fn new(
        vouchers: Arc<dyn VoucherRepository>,
        payments: Arc<dyn PaymentRepository>,
        devices: Arc<dyn DeviceRepository>,
        coordinator: Arc<ProvisioningCoordinator>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            vouchers,
            payments,
            devices,
            coordinator,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: PurchaseCompletedCommand,
    ) -> Result<PurchaseCompletedResult, DomainError> {
        // 1. Replay check: one voucher per payment, ever.
        let voucher = match self.vouchers.find_by_payment_id(&cmd.payment_id).await? {
            Some(existing) if existing.status != VoucherStatus::Pending => {
                info!(
                    payment = %cmd.payment_id,
                    voucher = %existing.code,
                    status = ?existing.status,
                    "payment already processed"
                );
                return Ok(PurchaseCompletedResult {
                    activated: existing.status == VoucherStatus::Active,
                    voucher: existing,
                });
            }
            Some(pending) => pending,
            None => self.mint_voucher(&cmd.payment_id).await?,
        };

        // 2. Provision on the device the payment named.
        let device = self.load_device(&voucher).await?;
        self.activate(voucher, &device).await
    }

    async fn mint_voucher(&self, payment_id: &PaymentId) -> Result<Voucher, DomainError> {
        let payment = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                    .with_detail("payment_id", payment_id.to_string())
            })?;

        let voucher = Voucher::from_purchase(
            VoucherSpec {
                profile: payment.profile.clone(),
                validity_hours: payment.validity_hours,
                data_limit_mb: payment.data_limit_mb,
                price_cents: payment.amount_cents,
                currency: payment.currency.clone(),
            },
            payment.customer_id,
            payment.id,
            payment.device_id,
        );
        self.vouchers.save(&voucher).await?;

        info!(
            voucher = %voucher.code,
            payment = %payment.id,
            profile = %voucher.profile,
            "voucher minted"
        );
        Ok(voucher)
    }

    async fn load_device(&self, voucher: &Voucher) -> Result<RouterDevice, DomainError> {
        let device_id = voucher.device_id.ok_or_else(|| {
            DomainError::new(ErrorCode::DeviceNotFound, "Voucher has no target device")
                .with_detail("voucher_id", voucher.id.to_string())
        })?;
        self.devices.find_by_id(&device_id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::DeviceNotFound, "Target device not found")
                .with_detail("device_id", device_id.to_string())
        })
    }

    async fn activate(
        &self,
        mut voucher: Voucher,
        device: &RouterDevice,
    ) -> Result<PurchaseCompletedResult, DomainError> {
        match self.coordinator.provision(&voucher, device).await {
            Ok(_) => {
                voucher.apply(&VoucherEvent::ProvisioningSucceeded {
                    at: Timestamp::now(),
                })?;
                let voucher = self.vouchers.update(&voucher).await?;
                let voucher = self.notify_activated(voucher).await;
                Ok(PurchaseCompletedResult {
                    voucher,
                    activated: true,
                })
            }
            Err(err) => {
                warn!(
                    voucher = %voucher.code,
                    device = %device.name,
                    error = %err,
                    retryable = err.is_retryable(),
                    "provisioning failed on purchase"
                );
                voucher.apply(&VoucherEvent::ProvisioningFailed {
                    error: err.to_string(),
                })?;
                if !err.is_retryable() {
                    voucher.flag_for_attention();
                }
                let voucher = self.vouchers.update(&voucher).await?;
                match err {
                    // Router trouble is the sweeper's problem now; the
                    // webhook still succeeded.
                    ProvisionError::Failed { .. } => Ok(PurchaseCompletedResult {
                        voucher,
                        activated: false,
                    }),
                    ProvisionError::Internal(inner) => Err(inner),
                }
            }
        }
    }

    /// Activation SMS is best-effort here; the credentials are persisted
    /// and a resend is always possible.
    async fn notify_activated(&self, voucher: Voucher) -> Voucher {
        match self
            .notifier
            .dispatch(&voucher, NotificationKind::Activated)
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                warn!(voucher = %voucher.code, error = %err, "activation sms failed");
                voucher
            }
        }
    }
}
