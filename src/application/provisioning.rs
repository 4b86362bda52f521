//! ProvisioningCoordinator - idempotent router-side voucher provisioning.
//!
//! The coordinator owns the device side of activation: creating and
//! removing hotspot users. It never mutates voucher state; callers apply
//! the matching lifecycle event once the router work is confirmed. It also
//! never sleeps or loops: a failed provision is recorded and left for the
//! sweeper, which re-attempts bounded by the configured ceiling.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::registry::DeviceRegistry;
use crate::domain::device::RouterDevice;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::voucher::Voucher;
use crate::ports::{
    AttemptOperation, AttemptOutcome, DeviceRepository, ProvisioningAttempt,
    ProvisioningAttemptLog, RouterClient, RouterError,
};

/// Outcome of a provision call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The hotspot user was created (or recovered) on this call.
    Provisioned { provider_id: Option<String> },
    /// A durable record shows the work was already done; nothing touched.
    AlreadyProvisioned,
}

/// Errors from provisioning.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The router-side operation failed.
    #[error("{message}")]
    Failed { message: String, retryable: bool },

    /// A repository or log operation failed.
    #[error(transparent)]
    Internal(#[from] DomainError),
}

impl ProvisionError {
    /// Whether the sweeper should re-attempt. Internal storage failures
    /// are treated as transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProvisionError::Failed { retryable, .. } => *retryable,
            ProvisionError::Internal(_) => true,
        }
    }
}

impl From<RouterError> for ProvisionError {
    fn from(err: RouterError) -> Self {
        ProvisionError::Failed {
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Coordinates hotspot user creation and removal on router devices.
pub struct ProvisioningCoordinator {
    router: Arc<dyn RouterClient>,
    devices: Arc<dyn DeviceRepository>,
    attempts: Arc<dyn ProvisioningAttemptLog>,
    registry: Arc<DeviceRegistry>,
}

impl ProvisioningCoordinator {
    pub fn new(
        router: Arc<dyn RouterClient>,
        devices: Arc<dyn DeviceRepository>,
        attempts: Arc<dyn ProvisioningAttemptLog>,
        registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            router,
            devices,
            attempts,
            registry,
        }
    }

    /// Ensures the voucher's hotspot user exists on the device.
    ///
    /// Safe to call any number of times: a durable success record
    /// short-circuits, and an already-present user with the expected
    /// password is adopted rather than duplicated. An existing user with a
    /// *different* password is a permanent failure; someone has to look.
    pub async fn provision(
        &self,
        voucher: &Voucher,
        device: &RouterDevice,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        // 1. Durable idempotency check. The cache is never consulted here.
        if let Some(prior) = self
            .attempts
            .find_success(&voucher.id, &device.id)
            .await?
        {
            info!(
                voucher = %voucher.code,
                device = %device.name,
                attempt = %prior.id,
                "provision already recorded, skipping"
            );
            return Ok(ProvisionOutcome::AlreadyProvisioned);
        }

        match self.push_user(voucher, device).await {
            Ok(provider_id) => {
                self.attempts
                    .append(&ProvisioningAttempt::record(
                        voucher.id,
                        device.id,
                        AttemptOperation::Provision,
                        AttemptOutcome::Success {
                            provider_id: provider_id.clone(),
                        },
                    ))
                    .await?;

                self.registry.invalidate(&device.id).await;
                self.mark_device(device, None).await;

                info!(
                    voucher = %voucher.code,
                    device = %device.name,
                    ?provider_id,
                    "hotspot user provisioned"
                );
                Ok(ProvisionOutcome::Provisioned { provider_id })
            }
            Err(err) => {
                self.attempts
                    .append(&ProvisioningAttempt::record(
                        voucher.id,
                        device.id,
                        AttemptOperation::Provision,
                        AttemptOutcome::Failure {
                            error: err.to_string(),
                            retryable: err.is_retryable(),
                        },
                    ))
                    .await?;

                self.mark_device(device, Some(&err)).await;

                warn!(
                    voucher = %voucher.code,
                    device = %device.name,
                    error = %err,
                    retryable = err.is_retryable(),
                    "provision failed"
                );
                Err(err)
            }
        }
    }

    /// Removes the voucher's hotspot user and kicks any live session.
    ///
    /// A user that is already gone counts as success.
    pub async fn deprovision(
        &self,
        voucher: &Voucher,
        device: &RouterDevice,
    ) -> Result<(), ProvisionError> {
        match self.remove_user(voucher, device).await {
            Ok(()) => {
                self.attempts
                    .append(&ProvisioningAttempt::record(
                        voucher.id,
                        device.id,
                        AttemptOperation::Deprovision,
                        AttemptOutcome::Success { provider_id: None },
                    ))
                    .await?;

                self.registry.invalidate(&device.id).await;
                self.mark_device(device, None).await;

                info!(voucher = %voucher.code, device = %device.name, "hotspot user removed");
                Ok(())
            }
            Err(err) => {
                self.attempts
                    .append(&ProvisioningAttempt::record(
                        voucher.id,
                        device.id,
                        AttemptOperation::Deprovision,
                        AttemptOutcome::Failure {
                            error: err.to_string(),
                            retryable: err.is_retryable(),
                        },
                    ))
                    .await?;

                self.mark_device(device, Some(&err)).await;
                Err(err)
            }
        }
    }

    async fn push_user(
        &self,
        voucher: &Voucher,
        device: &RouterDevice,
    ) -> Result<Option<String>, ProvisionError> {
        // 2. The device is the other source of truth: a user that already
        // exists means a prior attempt succeeded but our record was lost.
        let filters = [("name".to_string(), voucher.code.as_str().to_string())];
        let existing = self
            .router
            .query(device, "/ip/hotspot/user", &filters, &[])
            .await?;

        if let Some(row) = existing.first() {
            if row.get("password") == Some(voucher.password.as_str()) {
                warn!(
                    voucher = %voucher.code,
                    device = %device.name,
                    "hotspot user already present, adopting"
                );
                return Ok(row.internal_id().map(str::to_string));
            }
            return Err(ProvisionError::Failed {
                message: format!(
                    "hotspot user {} exists with a different password",
                    voucher.code
                ),
                retryable: false,
            });
        }

        // 3. Create the user.
        let mut params = vec![
            ("name".to_string(), voucher.code.as_str().to_string()),
            (
                "password".to_string(),
                voucher.password.as_str().to_string(),
            ),
            ("profile".to_string(), voucher.profile.clone()),
            (
                "limit-uptime".to_string(),
                format!("{}h", voucher.validity_hours),
            ),
        ];
        if let Some(limit_mb) = voucher.data_limit_mb {
            params.push((
                "limit-bytes-total".to_string(),
                (limit_mb * 1024 * 1024).to_string(),
            ));
        }

        let result = self
            .router
            .execute(device, "/ip/hotspot/user/add", &params)
            .await?;
        Ok(result.provider_id)
    }

    async fn remove_user(
        &self,
        voucher: &Voucher,
        device: &RouterDevice,
    ) -> Result<(), ProvisionError> {
        let filters = [("name".to_string(), voucher.code.as_str().to_string())];
        let users = self
            .router
            .query(device, "/ip/hotspot/user", &filters, &[])
            .await?;

        if let Some(id) = users.first().and_then(|row| row.internal_id()) {
            self.router
                .execute(
                    device,
                    "/ip/hotspot/user/remove",
                    &[(".id".to_string(), id.to_string())],
                )
                .await?;
        }

        // Kick any live session so removal takes effect immediately.
        let session_filters = [("user".to_string(), voucher.code.as_str().to_string())];
        let sessions = self
            .router
            .query(device, "/ip/hotspot/active", &session_filters, &[])
            .await?;
        for session in &sessions {
            if let Some(id) = session.internal_id() {
                self.router
                    .execute(
                        device,
                        "/ip/hotspot/active/remove",
                        &[(".id".to_string(), id.to_string())],
                    )
                    .await?;
            }
        }

        Ok(())
    }

    /// Persists the device's reachability based on the outcome. Failures
    /// here are logged but never mask the provisioning result.
    async fn mark_device(&self, device: &RouterDevice, failure: Option<&ProvisionError>) {
        let mut updated = device.clone();
        match failure {
            None => updated.mark_online(Timestamp::now(), device.uptime_seconds),
            Some(err) if err.is_retryable() => updated.mark_offline(err.to_string()),
            Some(err) => updated.mark_error(err.to_string()),
        }

        if let Err(e) = self.devices.update(&updated).await {
            warn!(device = %device.name, error = %e, "failed to persist device status");
        }
    }
}
