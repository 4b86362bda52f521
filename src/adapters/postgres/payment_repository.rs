//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{CustomerId, DeviceId, DomainError, ErrorCode, PaymentId, Timestamp};
use crate::ports::{PaymentRecord, PaymentRepository, PaymentState};

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    customer_id: Uuid,
    device_id: Uuid,
    profile: String,
    validity_hours: i32,
    data_limit_mb: Option<i64>,
    amount_cents: i64,
    currency: String,
    reference: String,
    state: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PaymentRecord {
            id: PaymentId::from_uuid(row.id),
            customer_id: CustomerId::from_uuid(row.customer_id),
            device_id: DeviceId::from_uuid(row.device_id),
            profile: row.profile,
            validity_hours: row.validity_hours as u32,
            data_limit_mb: row.data_limit_mb.map(|v| v as u64),
            amount_cents: row.amount_cents,
            currency: row.currency,
            reference: row.reference,
            state: parse_state(&row.state)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_state(s: &str) -> Result<PaymentState, DomainError> {
    match s {
        "pending" => Ok(PaymentState::Pending),
        "completed" => Ok(PaymentState::Completed),
        "failed" => Ok(PaymentState::Failed),
        "reversed" => Ok(PaymentState::Reversed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment state value: {s}"),
        )),
    }
}

fn state_to_string(state: PaymentState) -> &'static str {
    match state {
        PaymentState::Pending => "pending",
        PaymentState::Completed => "completed",
        PaymentState::Failed => "failed",
        PaymentState::Reversed => "reversed",
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, device_id, profile, validity_hours,
                   data_limit_mb, amount_cents, currency, reference, state,
                   created_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find payment: {e}"))
        })?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn update_state(&self, id: &PaymentId, state: PaymentState) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE payments SET state = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(state_to_string(state))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to update payment: {e}"),
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                "Payment not found",
            ));
        }

        Ok(())
    }
}
