//! PostgreSQL implementation of CustomerDirectory.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, PhoneNumber};
use crate::ports::{Customer, CustomerDirectory};

/// PostgreSQL implementation of the CustomerDirectory port.
pub struct PostgresCustomerDirectory {
    pool: PgPool,
}

impl PostgresCustomerDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    phone: String,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = DomainError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let phone = PhoneNumber::parse(&row.phone).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid stored phone number: {e}"),
            )
        })?;

        Ok(Customer {
            id: CustomerId::from_uuid(row.id),
            name: row.name,
            phone,
        })
    }
}

#[async_trait]
impl CustomerDirectory for PostgresCustomerDirectory {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, DomainError> {
        let row: Option<CustomerRow> =
            sqlx::query_as("SELECT id, name, phone FROM customers WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to find customer: {e}"),
                    )
                })?;

        row.map(Customer::try_from).transpose()
    }
}
