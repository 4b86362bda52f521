//! AdminDisableHandler - operator force-disable of a voucher.

use std::sync::Arc;
use tracing::{info, warn};

use crate::application::provisioning::ProvisioningCoordinator;
use crate::domain::foundation::{DomainError, ErrorCode, VoucherId};
use crate::domain::voucher::{Voucher, VoucherEvent};
use crate::ports::{DeviceRepository, VoucherRepository};

/// Command to disable a voucher by operator decision.
#[derive(Debug, Clone)]
pub struct AdminDisableCommand {
    pub voucher_id: VoucherId,
    pub reason: String,
}

/// Handler for admin disable overrides.
///
/// The override works from any non-terminal state. Router cleanup is
/// best-effort: an unreachable device never blocks the disable, and a
/// later deprovision (or the device's own limit enforcement) finishes
/// the job.
pub struct AdminDisableHandler {
    vouchers: Arc<dyn VoucherRepository>,
    devices: Arc<dyn DeviceRepository>,
    coordinator: Arc<ProvisioningCoordinator>,
}

impl AdminDisableHandler {
    pub fn new(
        vouchers: Arc<dyn VoucherRepository>,
        devices: Arc<dyn DeviceRepository>,
        coordinator: Arc<ProvisioningCoordinator>,
    ) -> Self {
        Self {
            vouchers,
            devices,
            coordinator,
        }
    }

    pub async fn handle(&self, cmd: AdminDisableCommand) -> Result<Voucher, DomainError> {
        let mut voucher = self
            .vouchers
            .find_by_id(&cmd.voucher_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::VoucherNotFound, "Voucher not found")
                    .with_detail("voucher_id", cmd.voucher_id.to_string())
            })?;

        let applied = voucher.apply(&VoucherEvent::AdminOverride {
            reason: cmd.reason.clone(),
        })?;
        if !applied.is_transition() {
            info!(voucher = %voucher.code, "voucher already disabled");
            return Ok(voucher);
        }
        let voucher = self.vouchers.update(&voucher).await?;

        self.deprovision_best_effort(&voucher).await;

        info!(voucher = %voucher.code, reason = %cmd.reason, "voucher disabled by operator");
        Ok(voucher)
    }

    async fn deprovision_best_effort(&self, voucher: &Voucher) {
        let Some(device_id) = voucher.device_id else {
            return;
        };
        let device = match self.devices.find_by_id(&device_id).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                warn!(voucher = %voucher.code, %device_id, "device gone, skipping cleanup");
                return;
            }
            Err(err) => {
                warn!(voucher = %voucher.code, error = %err, "device lookup failed");
                return;
            }
        };
        if let Err(err) = self.coordinator.deprovision(voucher, &device).await {
            warn!(
                voucher = %voucher.code,
                device = %device.name,
                error = %err,
                "router cleanup failed, access ends at device-enforced limit"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::support::World;
    use crate::domain::foundation::{PaymentId, Timestamp};
    use crate::domain::voucher::{VoucherSpec, VoucherStatus};
    use crate::ports::RouterError;

    fn active_voucher(world: &World) -> Voucher {
        let mut voucher = Voucher::from_purchase(
            VoucherSpec {
                profile: "24h-basic".to_string(),
                validity_hours: 24,
                data_limit_mb: None,
                price_cents: 5_000,
                currency: "KES".to_string(),
            },
            world.customer.id,
            PaymentId::new(),
            world.device.id,
        );
        voucher
            .apply(&VoucherEvent::ProvisioningSucceeded {
                at: Timestamp::now(),
            })
            .unwrap();
        world.vouchers.insert(voucher.clone());
        voucher
    }

    fn handler(world: &World) -> AdminDisableHandler {
        AdminDisableHandler::new(
            world.vouchers.clone(),
            world.devices.clone(),
            world.coordinator.clone(),
        )
    }

    #[tokio::test]
    async fn disables_active_voucher_and_records_reason() {
        let world = World::new();
        let voucher = active_voucher(&world);

        let disabled = handler(&world)
            .handle(AdminDisableCommand {
                voucher_id: voucher.id,
                reason: "fraudulent payment".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(disabled.status, VoucherStatus::Disabled);
        assert_eq!(disabled.status_reason.as_deref(), Some("fraudulent payment"));
        assert_eq!(
            world.vouchers.get(&voucher.id).status,
            VoucherStatus::Disabled
        );
    }

    #[tokio::test]
    async fn unreachable_router_does_not_block_the_disable() {
        let world = World::new();
        let voucher = active_voucher(&world);
        world
            .router
            .fail_with(RouterError::Unreachable("down".to_string()));

        let disabled = handler(&world)
            .handle(AdminDisableCommand {
                voucher_id: voucher.id,
                reason: "abuse report".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(disabled.status, VoucherStatus::Disabled);
    }

    #[tokio::test]
    async fn disabling_a_refunded_voucher_is_rejected() {
        let world = World::new();
        let mut voucher = active_voucher(&world);
        voucher
            .apply(&VoucherEvent::RefundRequested {
                reason: "complaint".to_string(),
            })
            .unwrap();
        world.vouchers.insert(voucher.clone());

        let err = handler(&world)
            .handle(AdminDisableCommand {
                voucher_id: voucher.id,
                reason: "late override".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[tokio::test]
    async fn unknown_voucher_is_rejected() {
        let world = World::new();
        let err = handler(&world)
            .handle(AdminDisableCommand {
                voucher_id: VoucherId::new(),
                reason: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VoucherNotFound);
    }
}
