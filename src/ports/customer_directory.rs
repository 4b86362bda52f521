//! Customer directory port.
//!
//! Read-only lookup into the customer store owned by the billing core.
//! The coordinator only ever needs enough to address an SMS.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CustomerId, DomainError, PhoneNumber};

/// The slice of a customer this subsystem cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: PhoneNumber,
}

/// Port for customer lookups.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Finds a customer by id.
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, DomainError>;
}
