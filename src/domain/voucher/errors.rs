//! Voucher domain errors.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, VoucherId};

use super::VoucherStatus;

/// Errors from voucher state transitions and lookups.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoucherError {
    /// The event is not legal for the voucher's current status. Caller
    /// error; surfaced immediately, never retried.
    #[error("cannot apply {event} to a {from} voucher")]
    InvalidTransition {
        from: VoucherStatus,
        event: &'static str,
    },

    /// Expiry was requested for a voucher whose window has not elapsed.
    #[error("voucher {id} does not expire until {expires_at}")]
    NotYetExpired { id: VoucherId, expires_at: String },

    /// A concurrent writer won the conditional update race. Re-read and
    /// re-evaluate.
    #[error("concurrent update detected for voucher {0}")]
    VersionConflict(VoucherId),

    /// No voucher matches the given identity.
    #[error("voucher not found: {0}")]
    NotFound(String),
}

impl VoucherError {
    pub fn invalid_transition(from: VoucherStatus, event: &'static str) -> Self {
        VoucherError::InvalidTransition { from, event }
    }
}

impl From<VoucherError> for DomainError {
    fn from(err: VoucherError) -> Self {
        let code = match &err {
            VoucherError::InvalidTransition { .. } | VoucherError::NotYetExpired { .. } => {
                ErrorCode::InvalidStateTransition
            }
            VoucherError::VersionConflict(_) => ErrorCode::VersionConflict,
            VoucherError::NotFound(_) => ErrorCode::VoucherNotFound,
        };
        DomainError::new(code, err.to_string())
    }
}
