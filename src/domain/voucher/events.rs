//! Voucher lifecycle events.
//!
//! Every state change flows through [`Voucher::apply`](super::Voucher::apply)
//! with one of these events. Events carry only what the transition needs;
//! side effects (router calls, SMS) belong to the coordinator layer.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CustomerId, Timestamp, VoucherId};

use super::VoucherStatus;

/// Events that drive the voucher state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VoucherEvent {
    /// Router provisioning succeeded; voucher becomes active and the
    /// validity window starts counting.
    ProvisioningSucceeded { at: Timestamp },

    /// Router provisioning failed but may be retried. The voucher stays
    /// pending; the error is recorded and the attempt counter incremented.
    ProvisioningFailed { error: String },

    /// The expiry sweeper found `expires_at` in the past.
    ExpirySwept { at: Timestamp },

    /// The router reported the uptime or data quota fully consumed.
    Consumed { at: Timestamp },

    /// Explicit deactivation by an operator.
    Deactivated { reason: String },

    /// Refund requested; payment will be reversed and access revoked.
    RefundRequested { reason: String },

    /// Voucher transferred; consumed here, reborn under a new owner.
    TransferRequested {
        new_owner: CustomerId,
        replacement: VoucherId,
        at: Timestamp,
    },

    /// Manual admin override: force-disable from any non-terminal state.
    AdminOverride { reason: String },
}

impl VoucherEvent {
    /// The status this event drives a voucher into, or `None` for events
    /// that leave the status unchanged (retryable provisioning failure).
    pub fn target_status(&self) -> Option<VoucherStatus> {
        match self {
            VoucherEvent::ProvisioningSucceeded { .. } => Some(VoucherStatus::Active),
            VoucherEvent::ProvisioningFailed { .. } => None,
            VoucherEvent::ExpirySwept { .. } => Some(VoucherStatus::Expired),
            VoucherEvent::Consumed { .. } => Some(VoucherStatus::Used),
            VoucherEvent::Deactivated { .. } => Some(VoucherStatus::Disabled),
            VoucherEvent::RefundRequested { .. } => Some(VoucherStatus::Refunded),
            VoucherEvent::TransferRequested { .. } => Some(VoucherStatus::Transferred),
            VoucherEvent::AdminOverride { .. } => Some(VoucherStatus::Disabled),
        }
    }

    /// Short name used in logs and the notification dedup key.
    pub fn name(&self) -> &'static str {
        match self {
            VoucherEvent::ProvisioningSucceeded { .. } => "provisioning_succeeded",
            VoucherEvent::ProvisioningFailed { .. } => "provisioning_failed",
            VoucherEvent::ExpirySwept { .. } => "expiry_swept",
            VoucherEvent::Consumed { .. } => "consumed",
            VoucherEvent::Deactivated { .. } => "deactivated",
            VoucherEvent::RefundRequested { .. } => "refund_requested",
            VoucherEvent::TransferRequested { .. } => "transfer_requested",
            VoucherEvent::AdminOverride { .. } => "admin_override",
        }
    }
}
