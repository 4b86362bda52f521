//! DeleteDeviceHandler - remove a router device from management.

use std::sync::Arc;
use tracing::info;

use crate::adapters::registry::DeviceRegistry;
use crate::domain::foundation::{DeviceId, DomainError, ErrorCode};
use crate::ports::{DeviceRepository, VoucherRepository};

/// Command to delete a device.
#[derive(Debug, Clone)]
pub struct DeleteDeviceCommand {
    pub device_id: DeviceId,
}

/// Handler for device deletion.
///
/// A device with vouchers still pointing at it cannot be deleted;
/// those vouchers would lose their provisioning target and their
/// router-side cleanup path. Operators disable or transfer them first.
pub struct DeleteDeviceHandler {
    devices: Arc<dyn DeviceRepository>,
    vouchers: Arc<dyn VoucherRepository>,
    registry: Arc<DeviceRegistry>,
}

impl DeleteDeviceHandler {
    pub fn new(
        devices: Arc<dyn DeviceRepository>,
        vouchers: Arc<dyn VoucherRepository>,
        registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            devices,
            vouchers,
            registry,
        }
    }

    pub async fn handle(&self, cmd: DeleteDeviceCommand) -> Result<(), DomainError> {
        let device = self
            .devices
            .find_by_id(&cmd.device_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::DeviceNotFound, "Device not found")
                    .with_detail("device_id", cmd.device_id.to_string())
            })?;

        let dependents = self.vouchers.count_for_device(&cmd.device_id).await?;
        if dependents > 0 {
            return Err(DomainError::new(
                ErrorCode::DeviceHasDependents,
                "Device still has vouchers attached",
            )
            .with_detail("device_id", cmd.device_id.to_string())
            .with_detail("voucher_count", dependents.to_string()));
        }

        self.devices.delete(&cmd.device_id).await?;
        self.registry.invalidate(&cmd.device_id).await;

        info!(device = %device.name, "device deleted");
        Ok(())
    }
}
