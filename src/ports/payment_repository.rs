//! Payment repository port.
//!
//! Read access to completed payments recorded by the billing core. A
//! payment row carries the plan that was bought, so the purchase handler
//! can mint the matching voucher without a second lookup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::payment_gateway::PaymentState;
use crate::domain::foundation::{CustomerId, DeviceId, DomainError, PaymentId, Timestamp};

/// A payment as the billing core recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub customer_id: CustomerId,
    /// The router the bought plan runs on.
    pub device_id: DeviceId,
    /// Hotspot profile name of the bought plan.
    pub profile: String,
    pub validity_hours: u32,
    pub data_limit_mb: Option<u64>,
    pub amount_cents: i64,
    pub currency: String,
    /// Provider-side reference.
    pub reference: String,
    pub state: PaymentState,
    pub created_at: Timestamp,
}

/// Port for payment persistence.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Finds a payment by id.
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError>;

    /// Records a state change (e.g. reversed after a refund).
    async fn update_state(&self, id: &PaymentId, state: PaymentState) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn PaymentRepository) {}
    }
}
