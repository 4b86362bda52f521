//! PostgreSQL implementation of ProvisioningAttemptLog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{AttemptId, DeviceId, DomainError, ErrorCode, Timestamp, VoucherId};
use crate::ports::{AttemptOperation, AttemptOutcome, ProvisioningAttempt, ProvisioningAttemptLog};

/// PostgreSQL implementation of the ProvisioningAttemptLog port.
pub struct PostgresAttemptLog {
    pool: PgPool,
}

impl PostgresAttemptLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AttemptRow {
    id: Uuid,
    voucher_id: Uuid,
    device_id: Uuid,
    operation: String,
    attempted_at: DateTime<Utc>,
    succeeded: bool,
    provider_id: Option<String>,
    error: Option<String>,
    retryable: Option<bool>,
}

impl TryFrom<AttemptRow> for ProvisioningAttempt {
    type Error = DomainError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let outcome = if row.succeeded {
            AttemptOutcome::Success {
                provider_id: row.provider_id,
            }
        } else {
            AttemptOutcome::Failure {
                error: row.error.unwrap_or_default(),
                retryable: row.retryable.unwrap_or(false),
            }
        };

        Ok(ProvisioningAttempt {
            id: AttemptId::from_uuid(row.id),
            voucher_id: VoucherId::from_uuid(row.voucher_id),
            device_id: DeviceId::from_uuid(row.device_id),
            operation: parse_operation(&row.operation)?,
            attempted_at: Timestamp::from_datetime(row.attempted_at),
            outcome,
        })
    }
}

fn parse_operation(s: &str) -> Result<AttemptOperation, DomainError> {
    match s {
        "provision" => Ok(AttemptOperation::Provision),
        "deprovision" => Ok(AttemptOperation::Deprovision),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid attempt operation value: {s}"),
        )),
    }
}

fn operation_to_string(operation: AttemptOperation) -> &'static str {
    match operation {
        AttemptOperation::Provision => "provision",
        AttemptOperation::Deprovision => "deprovision",
    }
}

const SELECT_COLUMNS: &str = r#"
    id, voucher_id, device_id, operation, attempted_at, succeeded,
    provider_id, error, retryable
"#;

#[async_trait]
impl ProvisioningAttemptLog for PostgresAttemptLog {
    async fn append(&self, attempt: &ProvisioningAttempt) -> Result<(), DomainError> {
        let (succeeded, provider_id, error, retryable) = match &attempt.outcome {
            AttemptOutcome::Success { provider_id } => {
                (true, provider_id.clone(), None, None)
            }
            AttemptOutcome::Failure { error, retryable } => {
                (false, None, Some(error.clone()), Some(*retryable))
            }
        };

        sqlx::query(
            r#"
            INSERT INTO provisioning_attempts (
                id, voucher_id, device_id, operation, attempted_at,
                succeeded, provider_id, error, retryable
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(attempt.id.as_uuid())
        .bind(attempt.voucher_id.as_uuid())
        .bind(attempt.device_id.as_uuid())
        .bind(operation_to_string(attempt.operation))
        .bind(attempt.attempted_at.as_datetime())
        .bind(succeeded)
        .bind(provider_id)
        .bind(error)
        .bind(retryable)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to log attempt: {e}"))
        })?;

        Ok(())
    }

    async fn find_success(
        &self,
        voucher_id: &VoucherId,
        device_id: &DeviceId,
    ) -> Result<Option<ProvisioningAttempt>, DomainError> {
        let row: Option<AttemptRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM provisioning_attempts
            WHERE voucher_id = $1 AND device_id = $2
              AND operation = 'provision' AND succeeded
            ORDER BY attempted_at DESC
            LIMIT 1
            "#
        ))
        .bind(voucher_id.as_uuid())
        .bind(device_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to query attempts: {e}"))
        })?;

        row.map(ProvisioningAttempt::try_from).transpose()
    }

    async fn find_for_voucher(
        &self,
        voucher_id: &VoucherId,
    ) -> Result<Vec<ProvisioningAttempt>, DomainError> {
        let rows: Vec<AttemptRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM provisioning_attempts
            WHERE voucher_id = $1
            ORDER BY attempted_at
            "#
        ))
        .bind(voucher_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to query attempts: {e}"))
        })?;

        rows.into_iter().map(ProvisioningAttempt::try_from).collect()
    }
}
