//! AddDeviceHandler - register a new router device.

use std::sync::Arc;
use tracing::info;

use crate::domain::device::{DeviceConfig, RouterDevice};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::DeviceRepository;

/// Command to register a device.
#[derive(Debug, Clone)]
pub struct AddDeviceCommand {
    pub config: DeviceConfig,
}

/// Handler for device registration.
///
/// New devices start offline; a connectivity test or the first health
/// check flips them online. Uniqueness of name and IP is enforced both
/// here and by database constraints, so a concurrent duplicate still
/// fails cleanly.
pub struct AddDeviceHandler {
    devices: Arc<dyn DeviceRepository>,
}

impl AddDeviceHandler {
    pub fn new(devices: Arc<dyn DeviceRepository>) -> Self {
        Self { devices }
    }

    pub async fn handle(&self, cmd: AddDeviceCommand) -> Result<RouterDevice, DomainError> {
        let config = cmd.config.validate()?;

        if self.devices.find_by_name(&config.name).await?.is_some() {
            return Err(DomainError::new(
                ErrorCode::DuplicateDeviceName,
                "A device with this name already exists",
            )
            .with_detail("name", config.name));
        }

        let device = RouterDevice::from_config(config);
        self.devices.save(&device).await?;

        info!(device = %device.name, endpoint = %device.endpoint(), "device registered");
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::support::World;
    use crate::domain::device::DeviceStatus;
    use secrecy::SecretString;

    fn config(name: &str, ip: &str) -> DeviceConfig {
        DeviceConfig::new(name, ip, 8728, "api", SecretString::new("pw".to_string()))
    }

    #[tokio::test]
    async fn registers_a_valid_device_offline() {
        let world = World::new();
        let handler = AddDeviceHandler::new(world.devices.clone());

        let device = handler
            .handle(AddDeviceCommand {
                config: config("gateway-02", "10.0.0.2"),
            })
            .await
            .unwrap();

        assert_eq!(device.status, DeviceStatus::Offline);
        assert!(world
            .devices
            .devices
            .lock()
            .unwrap()
            .contains_key(&device.id));
    }

    #[tokio::test]
    async fn rejects_duplicate_name() {
        let world = World::new();
        let handler = AddDeviceHandler::new(world.devices.clone());

        // World seeds "gateway-01".
        let err = handler
            .handle(AddDeviceCommand {
                config: config("gateway-01", "10.0.0.3"),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateDeviceName);
    }

    #[tokio::test]
    async fn rejects_invalid_config_before_persisting() {
        let world = World::new();
        let handler = AddDeviceHandler::new(world.devices.clone());
        let before = world.devices.devices.lock().unwrap().len();

        let result = handler
            .handle(AddDeviceCommand {
                config: config("gateway-03", "not-an-ip"),
            })
            .await;

        assert!(result.is_err());
        assert_eq!(world.devices.devices.lock().unwrap().len(), before);
    }
}
