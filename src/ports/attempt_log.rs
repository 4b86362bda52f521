//! Provisioning attempt log port.
//!
//! Durable record of every provisioning attempt. This is the idempotency
//! mechanism for router writes: before touching a device, the coordinator
//! checks for an existing success for the (voucher, device) pair. The
//! cache is never trusted for this — caches evict; this log does not.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AttemptId, DeviceId, DomainError, Timestamp, VoucherId};

/// Outcome of one provisioning attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The hotspot user exists on the device.
    Success {
        /// Device-assigned internal id (`*7`-style), when reported.
        provider_id: Option<String>,
    },

    /// The attempt failed.
    Failure {
        /// Normalized error detail.
        error: String,
        /// Whether the sweeper may retry.
        retryable: bool,
    },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }
}

/// One logged provisioning (or deprovisioning) attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningAttempt {
    pub id: AttemptId,
    pub voucher_id: VoucherId,
    pub device_id: DeviceId,
    pub operation: AttemptOperation,
    pub attempted_at: Timestamp,
    pub outcome: AttemptOutcome,
}

/// Which direction the attempt went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOperation {
    Provision,
    Deprovision,
}

impl ProvisioningAttempt {
    /// Builds a new attempt record stamped now.
    pub fn record(
        voucher_id: VoucherId,
        device_id: DeviceId,
        operation: AttemptOperation,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            id: AttemptId::new(),
            voucher_id,
            device_id,
            operation,
            attempted_at: Timestamp::now(),
            outcome,
        }
    }
}

/// Port for the durable attempt log.
#[async_trait]
pub trait ProvisioningAttemptLog: Send + Sync {
    /// Appends an attempt record.
    async fn append(&self, attempt: &ProvisioningAttempt) -> Result<(), DomainError>;

    /// Finds an existing *successful provision* for the pair, if any.
    async fn find_success(
        &self,
        voucher_id: &VoucherId,
        device_id: &DeviceId,
    ) -> Result<Option<ProvisioningAttempt>, DomainError>;

    /// All attempts for a voucher, oldest first (operator visibility).
    async fn find_for_voucher(
        &self,
        voucher_id: &VoucherId,
    ) -> Result<Vec<ProvisioningAttempt>, DomainError>;
}
