//! Voucher aggregate entity.
//!
//! The Voucher aggregate represents one purchased (or manually issued)
//! access credential. All state changes flow through [`Voucher::apply`],
//! which validates the transition against the state machine, mutates the
//! fields the transition owns, and reports idempotent re-application as a
//! no-op success rather than an error.
//!
//! # Design Decisions
//!
//! - **Side-effect free**: the aggregate never talks to routers, gateways,
//!   or SMS senders. Callers persist the result and trigger side effects.
//! - **Money in cents**: price stored as i64 cents, immutable once set.
//! - **Optimistic version**: incremented by the repository's conditional
//!   update; concurrent writers race on it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CustomerId, DeviceId, PaymentId, StateMachine, Timestamp, VoucherId};

use super::{VoucherCode, VoucherError, VoucherEvent, VoucherPassword, VoucherStatus};

/// Outcome of applying an event to a voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The voucher changed state.
    Transitioned(VoucherStatus),

    /// The voucher was already in the event's target state. No fields were
    /// touched; duplicate webhooks and overlapping sweeps land here.
    AlreadyApplied,
}

impl Applied {
    /// True if this application actually changed state (and side effects
    /// should fire).
    pub fn is_transition(&self) -> bool {
        matches!(self, Applied::Transitioned(_))
    }
}

/// Voucher aggregate.
///
/// # Invariants
///
/// - `expires_at` is set if and only if `activated_at` is set
/// - `price_cents`/`currency` never change after construction
/// - terminal statuses admit no further transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    /// Unique identifier.
    pub id: VoucherId,

    /// Human-readable code; doubles as the hotspot username.
    pub code: VoucherCode,

    /// Hotspot password, delivered to the customer over SMS.
    pub password: VoucherPassword,

    /// Bandwidth/data-plan tier name, referenced on the router by name.
    pub profile: String,

    /// Validity window in hours, counted from activation.
    pub validity_hours: u32,

    /// Data quota in megabytes; `None` means unlimited.
    pub data_limit_mb: Option<u64>,

    /// Purchase price in minor units.
    pub price_cents: i64,

    /// ISO currency code of the purchase.
    pub currency: String,

    /// Current lifecycle status.
    pub status: VoucherStatus,

    /// Owning customer.
    pub customer_id: CustomerId,

    /// Funding payment; `None` for manually issued vouchers.
    pub payment_id: Option<PaymentId>,

    /// Device the voucher is (or was) provisioned on.
    pub device_id: Option<DeviceId>,

    /// When the voucher was created.
    pub created_at: Timestamp,

    /// When provisioning succeeded; `None` until activation.
    pub activated_at: Option<Timestamp>,

    /// `activated_at + validity_hours`; `None` until activation.
    pub expires_at: Option<Timestamp>,

    /// When the credentials SMS was confirmed sent.
    pub sms_sent_at: Option<Timestamp>,

    /// Number of provisioning attempts so far.
    pub provision_attempts: u32,

    /// Error detail from the most recent failed provisioning attempt.
    pub last_provision_error: Option<String>,

    /// Set when the retry ceiling is exhausted; operators must intervene.
    pub needs_attention: bool,

    /// Operator-supplied reason for disable/refund transitions.
    pub status_reason: Option<String>,

    /// Replacement voucher minted by a transfer out of this one.
    pub transferred_to: Option<VoucherId>,

    /// Source voucher when this one was minted by a transfer.
    pub transferred_from: Option<VoucherId>,

    /// When the voucher was last updated.
    pub updated_at: Timestamp,

    /// Optimistic concurrency version, bumped on every persisted update.
    pub version: i64,
}

/// Parameters shared by both construction paths.
#[derive(Debug, Clone)]
pub struct VoucherSpec {
    pub profile: String,
    pub validity_hours: u32,
    pub data_limit_mb: Option<u64>,
    pub price_cents: i64,
    pub currency: String,
}

impl Voucher {
    /// Creates a pending voucher funded by a confirmed payment.
    pub fn from_purchase(
        spec: VoucherSpec,
        customer_id: CustomerId,
        payment_id: PaymentId,
        device_id: DeviceId,
    ) -> Self {
        Self::new_pending(spec, customer_id, Some(payment_id), Some(device_id))
    }

    /// Creates a pending voucher issued manually by an operator (no payment).
    pub fn manual_issue(spec: VoucherSpec, customer_id: CustomerId, device_id: DeviceId) -> Self {
        Self::new_pending(spec, customer_id, None, Some(device_id))
    }

    fn new_pending(
        spec: VoucherSpec,
        customer_id: CustomerId,
        payment_id: Option<PaymentId>,
        device_id: Option<DeviceId>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: VoucherId::new(),
            code: VoucherCode::generate(),
            password: VoucherPassword::generate(),
            profile: spec.profile,
            validity_hours: spec.validity_hours,
            data_limit_mb: spec.data_limit_mb,
            price_cents: spec.price_cents,
            currency: spec.currency,
            status: VoucherStatus::Pending,
            customer_id,
            payment_id,
            device_id,
            created_at: now,
            activated_at: None,
            expires_at: None,
            sms_sent_at: None,
            provision_attempts: 0,
            last_provision_error: None,
            needs_attention: false,
            status_reason: None,
            transferred_to: None,
            transferred_from: None,
            updated_at: now,
            version: 0,
        }
    }

    /// Applies a lifecycle event.
    ///
    /// Re-applying an event whose target state already holds is reported as
    /// [`Applied::AlreadyApplied`] without touching any field, so duplicate
    /// webhook callbacks and overlapping sweep passes are harmless.
    ///
    /// # Errors
    ///
    /// Returns [`VoucherError::InvalidTransition`] when the current status
    /// does not permit the event, and [`VoucherError::NotYetExpired`] when
    /// an expiry is attempted before the window has elapsed.
    pub fn apply(&mut self, event: &VoucherEvent) -> Result<Applied, VoucherError> {
        let Some(target) = event.target_status() else {
            return self.record_provision_failure(event);
        };

        if self.status == target {
            return Ok(Applied::AlreadyApplied);
        }

        if !self.status.can_transition_to(&target) {
            return Err(VoucherError::invalid_transition(self.status, event.name()));
        }

        match event {
            VoucherEvent::ProvisioningSucceeded { at } => {
                self.activated_at = Some(*at);
                self.expires_at = Some(at.plus_hours(i64::from(self.validity_hours)));
                self.last_provision_error = None;
                self.needs_attention = false;
            }
            VoucherEvent::ExpirySwept { at } => match self.expires_at {
                Some(expires_at) if !expires_at.is_after(at) => {}
                Some(expires_at) => {
                    return Err(VoucherError::NotYetExpired {
                        id: self.id,
                        expires_at: expires_at.to_string(),
                    });
                }
                // Unreachable in practice: active implies expires_at set.
                None => {
                    return Err(VoucherError::invalid_transition(self.status, event.name()));
                }
            },
            VoucherEvent::Consumed { .. } => {}
            VoucherEvent::Deactivated { reason } | VoucherEvent::AdminOverride { reason } => {
                self.status_reason = Some(reason.clone());
            }
            VoucherEvent::RefundRequested { reason } => {
                self.status_reason = Some(reason.clone());
            }
            VoucherEvent::TransferRequested { replacement, .. } => {
                self.transferred_to = Some(*replacement);
            }
            VoucherEvent::ProvisioningFailed { .. } => unreachable!("handled above"),
        }

        self.status = target;
        self.updated_at = Timestamp::now();
        Ok(Applied::Transitioned(target))
    }

    /// Retryable provisioning failure: no status change, record the error
    /// and bump the attempt counter.
    fn record_provision_failure(&mut self, event: &VoucherEvent) -> Result<Applied, VoucherError> {
        let VoucherEvent::ProvisioningFailed { error } = event else {
            return Err(VoucherError::invalid_transition(self.status, event.name()));
        };
        match self.status {
            VoucherStatus::Pending => {
                self.provision_attempts += 1;
                self.last_provision_error = Some(error.clone());
                self.updated_at = Timestamp::now();
                Ok(Applied::Transitioned(VoucherStatus::Pending))
            }
            // A stale failure report racing a successful activation is noise.
            VoucherStatus::Active => Ok(Applied::AlreadyApplied),
            _ => Err(VoucherError::invalid_transition(self.status, event.name())),
        }
    }

    /// Consumes this voucher by transfer and mints its replacement for the
    /// new owner: same plan, fresh code and password, pending provisioning.
    pub fn transfer_to(
        &mut self,
        new_owner: CustomerId,
        at: Timestamp,
    ) -> Result<Voucher, VoucherError> {
        let mut replacement = Self::new_pending(
            VoucherSpec {
                profile: self.profile.clone(),
                validity_hours: self.validity_hours,
                data_limit_mb: self.data_limit_mb,
                price_cents: self.price_cents,
                currency: self.currency.clone(),
            },
            new_owner,
            self.payment_id,
            self.device_id,
        );
        replacement.transferred_from = Some(self.id);

        self.apply(&VoucherEvent::TransferRequested {
            new_owner,
            replacement: replacement.id,
            at,
        })?;

        Ok(replacement)
    }

    /// Marks the retry ceiling as exhausted; the sweeper stops retrying and
    /// operators take over.
    pub fn flag_for_attention(&mut self) {
        self.needs_attention = true;
        self.updated_at = Timestamp::now();
    }

    /// Records the confirmed delivery of the credentials SMS.
    pub fn mark_notified(&mut self, at: Timestamp) {
        self.sms_sent_at = Some(at);
        self.updated_at = Timestamp::now();
    }

    /// True if the validity window has elapsed (regardless of status).
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        match self.expires_at {
            Some(expires_at) => !expires_at.is_after(now),
            None => false,
        }
    }

    /// Percentage of the data quota consumed, if a quota exists.
    pub fn data_usage_percentage(&self, used_bytes: u64) -> Option<f64> {
        self.data_limit_mb.map(|limit_mb| {
            let limit_bytes = limit_mb.saturating_mul(1024 * 1024);
            if limit_bytes == 0 {
                return 100.0;
            }
            (used_bytes as f64 / limit_bytes as f64 * 100.0).min(100.0)
        })
    }
}
