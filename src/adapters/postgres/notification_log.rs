//! PostgreSQL implementation of NotificationLog.
//!
//! The `(voucher_id, kind)` primary key makes the dedup guarantee a
//! database invariant; `record` treats the conflict as already-recorded.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, VoucherId};
use crate::ports::{NotificationKind, NotificationLog, NotificationRecord};

/// PostgreSQL implementation of the NotificationLog port.
pub struct PostgresNotificationLog {
    pool: PgPool,
}

impl PostgresNotificationLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLog for PostgresNotificationLog {
    async fn contains(
        &self,
        voucher_id: &VoucherId,
        kind: NotificationKind,
    ) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM notification_log
                WHERE voucher_id = $1 AND kind = $2
            )
            "#,
        )
        .bind(voucher_id.as_uuid())
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to check notification log: {e}"),
            )
        })?;

        Ok(exists)
    }

    async fn record(&self, record: &NotificationRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO notification_log (
                voucher_id, kind, recipient, sent_at, gateway_message_id
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (voucher_id, kind) DO NOTHING
            "#,
        )
        .bind(record.voucher_id.as_uuid())
        .bind(record.kind.as_str())
        .bind(&record.recipient)
        .bind(record.sent_at.as_datetime())
        .bind(&record.gateway_message_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record notification: {e}"),
            )
        })?;

        Ok(())
    }
}
