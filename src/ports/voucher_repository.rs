//! Voucher repository port.
//!
//! Persistence for voucher records. Updates are conditional on the
//! optimistic version the aggregate was loaded with, so concurrent writers
//! (a refund racing the expiry sweeper) are linearized: exactly one update
//! lands, the loser gets a version conflict and must re-read.

use async_trait::async_trait;

use crate::domain::foundation::{DeviceId, DomainError, PaymentId, Timestamp, VoucherId};
use crate::domain::voucher::{Voucher, VoucherCode, VoucherStatus};

/// Port for voucher persistence.
#[async_trait]
pub trait VoucherRepository: Send + Sync {
    /// Inserts a new voucher. Fails on duplicate id or code.
    async fn save(&self, voucher: &Voucher) -> Result<(), DomainError>;

    /// Persists an updated voucher, conditional on `voucher.version`
    /// still being current. Returns the voucher with its bumped version.
    ///
    /// # Errors
    ///
    /// `ErrorCode::VersionConflict` when another writer got there first.
    async fn update(&self, voucher: &Voucher) -> Result<Voucher, DomainError>;

    /// Finds a voucher by id.
    async fn find_by_id(&self, id: &VoucherId) -> Result<Option<Voucher>, DomainError>;

    /// Finds a voucher by its unique code.
    async fn find_by_code(&self, code: &VoucherCode) -> Result<Option<Voucher>, DomainError>;

    /// Finds the voucher funded by a payment, if any.
    async fn find_by_payment_id(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<Voucher>, DomainError>;

    /// All vouchers in a given status.
    async fn find_by_status(&self, status: VoucherStatus) -> Result<Vec<Voucher>, DomainError>;

    /// Active vouchers whose `expires_at` is at or before `now`, oldest
    /// first, at most `limit`.
    async fn find_expired(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<Voucher>, DomainError>;

    /// Pending vouchers with at least one failed attempt, below the retry
    /// ceiling and not yet flagged for attention, at most `limit`.
    async fn find_stuck_pending(
        &self,
        max_attempts: u32,
        limit: u32,
    ) -> Result<Vec<Voucher>, DomainError>;

    /// Number of vouchers referencing a device (dependency check before
    /// device deletion).
    async fn count_for_device(&self, device_id: &DeviceId) -> Result<u64, DomainError>;
}
