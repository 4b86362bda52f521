//! Payment gateway port.
//!
//! Minimal contract against the upstream payment provider. Real gateway
//! integrations live outside this subsystem; the mock adapter is enough
//! for the voucher lifecycle, which only ever verifies and reverses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{CustomerId, PaymentId, PhoneNumber};

/// A request to start a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub customer_id: CustomerId,
    pub phone: PhoneNumber,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
}

/// Gateway-side payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Completed,
    Failed,
    Reversed,
}

/// Outcome of a gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub payment_id: PaymentId,
    pub state: PaymentState,
    /// Provider-side reference for reconciliation.
    pub reference: String,
}

/// Errors from the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("payment gateway unreachable: {0}")]
    GatewayUnreachable(String),

    #[error("payment declined: {0}")]
    Declined(String),

    #[error("unknown payment reference: {0}")]
    UnknownReference(String),
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::GatewayUnreachable(_))
    }
}

/// Port for payment provider access.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Starts a payment with the provider.
    async fn initialize_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentResult, PaymentError>;

    /// Re-checks the provider-side state of a payment.
    async fn verify_payment(&self, reference: &str) -> Result<PaymentResult, PaymentError>;

    /// Reverses a completed payment (refund flow).
    async fn reverse_payment(&self, reference: &str) -> Result<PaymentResult, PaymentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gw: &dyn PaymentGateway) {}
    }

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(PaymentError::GatewayUnreachable("x".into()).is_retryable());
        assert!(!PaymentError::Declined("x".into()).is_retryable());
        assert!(!PaymentError::UnknownReference("x".into()).is_retryable());
    }
}
