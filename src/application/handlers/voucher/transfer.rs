//! TransferVoucherHandler - move a voucher to a new owner.
//!
//! A transfer never edits credentials in place. The original voucher is
//! consumed and a replacement with a fresh code and password is minted
//! for the new owner, so the old credentials stop working and the SMS
//! trail stays unambiguous. The replacement goes through the normal
//! provisioning path; if the router is down it stays pending and the
//! sweeper picks it up.

use std::sync::Arc;
use tracing::{info, warn};

use crate::application::notification::NotificationDispatcher;
use crate::application::provisioning::{ProvisionError, ProvisioningCoordinator};
use crate::domain::device::RouterDevice;
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, Timestamp, VoucherId};
use crate::domain::voucher::{Voucher, VoucherEvent};
use crate::ports::{CustomerDirectory, DeviceRepository, NotificationKind, VoucherRepository};

/// Command to transfer a voucher to another customer.
#[derive(Debug, Clone)]
pub struct TransferVoucherCommand {
    pub voucher_id: VoucherId,
    pub new_owner: CustomerId,
}

/// Result of a transfer.
#[derive(Debug, Clone)]
pub struct TransferVoucherResult {
    /// The consumed original, now in the transferred state.
    pub original: Voucher,
    /// The replacement minted for the new owner.
    pub replacement: Voucher,
    /// True when the replacement was provisioned on this call.
    pub activated: bool,
}

/// Handler for voucher transfers.
pub struct TransferVoucherHandler {
    vouchers: Arc<dyn VoucherRepository>,
    customers: Arc<dyn CustomerDirectory>,
    devices: Arc<dyn DeviceRepository>,
    coordinator: Arc<ProvisioningCoordinator>,
    notifier: Arc<NotificationDispatcher>,
}

impl TransferVoucherHandler {
    pub fn new(
        vouchers: Arc<dyn VoucherRepository>,
        customers: Arc<dyn CustomerDirectory>,
        devices: Arc<dyn DeviceRepository>,
        coordinator: Arc<ProvisioningCoordinator>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            vouchers,
            customers,
            devices,
            coordinator,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: TransferVoucherCommand,
    ) -> Result<TransferVoucherResult, DomainError> {
        let mut original = self
            .vouchers
            .find_by_id(&cmd.voucher_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::VoucherNotFound, "Voucher not found")
                    .with_detail("voucher_id", cmd.voucher_id.to_string())
            })?;

        // The new owner must exist before anything is consumed.
        self.customers
            .find_by_id(&cmd.new_owner)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::CustomerNotFound, "Transfer target not found")
                    .with_detail("customer_id", cmd.new_owner.to_string())
            })?;

        // 1. Consume the original and mint the replacement atomically in
        //    the aggregate, then persist in that order. The conditional
        //    update on the original settles any concurrent race.
        let replacement = original.transfer_to(cmd.new_owner, Timestamp::now())?;
        let original = self.vouchers.update(&original).await?;
        self.vouchers.save(&replacement).await?;

        // 2. Swap the credentials on the device.
        let device = self.load_device(&replacement).await?;
        self.deprovision_original(&original, &device).await;
        let (replacement, activated) = self.provision_replacement(replacement, &device).await?;

        info!(
            original = %original.code,
            replacement = %replacement.code,
            new_owner = %cmd.new_owner,
            activated,
            "voucher transferred"
        );
        Ok(TransferVoucherResult {
            original,
            replacement,
            activated,
        })
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

    async fn deprovision_original(&self, original: &Voucher, device: &RouterDevice) {
        if let Err(err) = self.coordinator.deprovision(original, device).await {
            warn!(
                voucher = %original.code,
                device = %device.name,
                error = %err,
                "old credentials not removed, device limit will end them"
            );
        }
    }

    async fn provision_replacement(
        &self,
        mut replacement: Voucher,
        device: &RouterDevice,
    ) -> Result<(Voucher, bool), DomainError> {
        match self.coordinator.provision(&replacement, device).await {
            Ok(_) => {
                replacement.apply(&VoucherEvent::ProvisioningSucceeded {
                    at: Timestamp::now(),
                })?;
                let replacement = self.vouchers.update(&replacement).await?;
                let replacement = match self
                    .notifier
                    .dispatch(&replacement, NotificationKind::Transferred)
                    .await
                {
                    Ok(updated) => updated,
                    Err(err) => {
                        warn!(voucher = %replacement.code, error = %err, "transfer sms failed");
                        replacement
                    }
                };
                Ok((replacement, true))
            }
            Err(err) => {
                warn!(
                    voucher = %replacement.code,
                    device = %device.name,
                    error = %err,
                    "replacement provisioning failed, sweeper will retry"
                );
                replacement.apply(&VoucherEvent::ProvisioningFailed {
                    error: err.to_string(),
                })?;
                if !err.is_retryable() {
                    replacement.flag_for_attention();
                }
                let replacement = self.vouchers.update(&replacement).await?;
                match err {
                    ProvisionError::Failed { .. } => Ok((replacement, false)),
                    ProvisionError::Internal(inner) => Err(inner),
                }
            }
        }
    }
}
