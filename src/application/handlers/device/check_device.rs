//! CheckDeviceHandler - health-check a registered device.
//!
//! Unlike the pre-registration connectivity test, this probes a device
//! we already manage and persists the outcome on its record, so device
//! lists reflect reality without waiting for the next provisioning call
//! to trip over an outage.

use std::sync::Arc;

use crate::adapters::registry::DeviceRegistry;
use crate::domain::device::RouterDevice;
use crate::domain::foundation::{DeviceId, DomainError, ErrorCode};
use crate::ports::DeviceRepository;

/// Command to health-check one device.
#[derive(Debug, Clone)]
pub struct CheckDeviceCommand {
    pub device_id: DeviceId,
}

/// Handler for device health checks.
pub struct CheckDeviceHandler {
    devices: Arc<dyn DeviceRepository>,
    registry: Arc<DeviceRegistry>,
}

impl CheckDeviceHandler {
    pub fn new(devices: Arc<dyn DeviceRepository>, registry: Arc<DeviceRegistry>) -> Self {
        Self { devices, registry }
    }

    /// Probes the device and returns its updated record. An unreachable
    /// device is a result (marked offline), not an error.
    pub async fn handle(&self, cmd: CheckDeviceCommand) -> Result<RouterDevice, DomainError> {
        let device = self
            .devices
            .find_by_id(&cmd.device_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::DeviceNotFound, "Device not found")
                    .with_detail("device_id", cmd.device_id.to_string())
            })?;

        self.registry.check_health(&device).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::support::World;
    use crate::domain::device::DeviceStatus;
    use crate::ports::{RouterError, RouterRow};

    fn handler(world: &World) -> CheckDeviceHandler {
        CheckDeviceHandler::new(world.devices.clone(), world.registry.clone())
    }

    fn resource_row() -> RouterRow {
        [
            ("uptime".to_string(), "2d5h".to_string()),
            ("version".to_string(), "7.14.2".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn reachable_device_goes_online_with_uptime() {
        let world = World::new();
        world.router.set_rows("/system/resource", vec![resource_row()]);

        let updated = handler(&world)
            .handle(CheckDeviceCommand {
                device_id: world.device.id,
            })
            .await
            .unwrap();

        assert_eq!(updated.status, DeviceStatus::Online);
        assert_eq!(updated.uptime_seconds, Some(2 * 86_400 + 5 * 3_600));
        assert!(updated.last_seen.is_some());

        // The probe outcome is persisted.
        let stored = world
            .devices
            .find_by_id(&world.device.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, DeviceStatus::Online);
    }

    #[tokio::test]
    async fn unreachable_device_goes_offline_without_erroring() {
        let world = World::new();
        world
            .router
            .fail_with(RouterError::Unreachable("connection refused".to_string()));

        let updated = handler(&world)
            .handle(CheckDeviceCommand {
                device_id: world.device.id,
            })
            .await
            .unwrap();

        assert_eq!(updated.status, DeviceStatus::Offline);
        assert!(updated.last_error.is_some());
    }

    #[tokio::test]
    async fn unknown_device_is_rejected() {
        let world = World::new();
        let err = handler(&world)
            .handle(CheckDeviceCommand {
                device_id: DeviceId::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DeviceNotFound);
    }
}
