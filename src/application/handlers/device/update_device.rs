//! UpdateDeviceHandler - partial update of a registered device.

use std::sync::Arc;
use tracing::info;

use crate::adapters::registry::DeviceRegistry;
use crate::domain::device::{DeviceConfig, DevicePassword, DevicePatch, RouterDevice};
use crate::domain::foundation::{DeviceId, DomainError, ErrorCode, Timestamp};
use crate::ports::DeviceRepository;

/// Command carrying the fields to change.
#[derive(Debug, Clone)]
pub struct UpdateDeviceCommand {
    pub device_id: DeviceId,
    pub patch: DevicePatch,
}

/// Handler for device updates.
///
/// The patch is merged over the current record and the merged result
/// re-validated with the same rules as creation. Any cached reads for
/// the device are dropped, since changed credentials or address make
/// them meaningless.
pub struct UpdateDeviceHandler {
    devices: Arc<dyn DeviceRepository>,
    registry: Arc<DeviceRegistry>,
}

impl UpdateDeviceHandler {
    pub fn new(devices: Arc<dyn DeviceRepository>, registry: Arc<DeviceRegistry>) -> Self {
        Self { devices, registry }
    }

    pub async fn handle(&self, cmd: UpdateDeviceCommand) -> Result<RouterDevice, DomainError> {
        let device = self
            .devices
            .find_by_id(&cmd.device_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::DeviceNotFound, "Device not found")
                    .with_detail("device_id", cmd.device_id.to_string())
            })?;

        if cmd.patch.is_empty() {
            return Ok(device);
        }

        let password = cmd
            .patch
            .password
            .or_else(|| device.password().cloned())
            .ok_or_else(|| {
                DomainError::new(ErrorCode::CryptoError, "Device credentials not loaded")
                    .with_detail("device_id", device.id.to_string())
            })?;

        let merged = DeviceConfig::new(
            cmd.patch.name.unwrap_or_else(|| device.name.clone()),
            cmd.patch
                .ip_address
                .unwrap_or_else(|| device.ip_address.to_string()),
            cmd.patch.api_port.unwrap_or(device.api_port),
            cmd.patch.username.unwrap_or_else(|| device.username.clone()),
            password,
        )
        .validate()?;

        if merged.name != device.name {
            if let Some(other) = self.devices.find_by_name(&merged.name).await? {
                if other.id != device.id {
                    return Err(DomainError::new(
                        ErrorCode::DuplicateDeviceName,
                        "A device with this name already exists",
                    )
                    .with_detail("name", merged.name));
                }
            }
        }

        let mut updated = device;
        updated.name = merged.name;
        updated.ip_address = merged.ip_address;
        updated.api_port = merged.api_port;
        updated.username = merged.username;
        updated.password = DevicePassword::new(merged.password);
        updated.updated_at = Timestamp::now();

        self.devices.update(&updated).await?;
        self.registry.invalidate(&updated.id).await;

        info!(device = %updated.name, endpoint = %updated.endpoint(), "device updated");
        Ok(updated)
    }
}
