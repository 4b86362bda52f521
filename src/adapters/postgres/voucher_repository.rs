//! PostgreSQL implementation of VoucherRepository.
//!
//! Persistent storage for voucher aggregates. Updates are compare-and-set
//! on the version column, so a refund racing the expiry sweeper loses
//! cleanly with a version conflict instead of overwriting a terminal state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    CustomerId, DeviceId, DomainError, ErrorCode, PaymentId, Timestamp, VoucherId,
};
use crate::domain::voucher::{Voucher, VoucherCode, VoucherPassword, VoucherStatus};
use crate::ports::VoucherRepository;

/// PostgreSQL implementation of the VoucherRepository port.
pub struct PostgresVoucherRepository {
    pool: PgPool,
}

impl PostgresVoucherRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a voucher.
#[derive(Debug, sqlx::FromRow)]
struct VoucherRow {
    id: Uuid,
    code: String,
    password: String,
    profile: String,
    validity_hours: i32,
    data_limit_mb: Option<i64>,
    price_cents: i64,
    currency: String,
    status: String,
    customer_id: Uuid,
    payment_id: Option<Uuid>,
    device_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    activated_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    sms_sent_at: Option<DateTime<Utc>>,
    provision_attempts: i32,
    last_provision_error: Option<String>,
    needs_attention: bool,
    status_reason: Option<String>,
    transferred_to: Option<Uuid>,
    transferred_from: Option<Uuid>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<VoucherRow> for Voucher {
    type Error = DomainError;

    fn try_from(row: VoucherRow) -> Result<Self, Self::Error> {
        let code = VoucherCode::parse(row.code).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored code: {e}"))
        })?;
        let password = VoucherPassword::parse(row.password).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid stored password: {e}"),
            )
        })?;

        Ok(Voucher {
            id: VoucherId::from_uuid(row.id),
            code,
            password,
            profile: row.profile,
            validity_hours: row.validity_hours as u32,
            data_limit_mb: row.data_limit_mb.map(|v| v as u64),
            price_cents: row.price_cents,
            currency: row.currency,
            status: parse_status(&row.status)?,
            customer_id: CustomerId::from_uuid(row.customer_id),
            payment_id: row.payment_id.map(PaymentId::from_uuid),
            device_id: row.device_id.map(DeviceId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            activated_at: row.activated_at.map(Timestamp::from_datetime),
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            sms_sent_at: row.sms_sent_at.map(Timestamp::from_datetime),
            provision_attempts: row.provision_attempts as u32,
            last_provision_error: row.last_provision_error,
            needs_attention: row.needs_attention,
            status_reason: row.status_reason,
            transferred_to: row.transferred_to.map(VoucherId::from_uuid),
            transferred_from: row.transferred_from.map(VoucherId::from_uuid),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

fn parse_status(s: &str) -> Result<VoucherStatus, DomainError> {
    match s {
        "pending" => Ok(VoucherStatus::Pending),
        "active" => Ok(VoucherStatus::Active),
        "used" => Ok(VoucherStatus::Used),
        "expired" => Ok(VoucherStatus::Expired),
        "disabled" => Ok(VoucherStatus::Disabled),
        "refunded" => Ok(VoucherStatus::Refunded),
        "transferred" => Ok(VoucherStatus::Transferred),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {s}"),
        )),
    }
}

fn status_to_string(status: VoucherStatus) -> &'static str {
    match status {
        VoucherStatus::Pending => "pending",
        VoucherStatus::Active => "active",
        VoucherStatus::Used => "used",
        VoucherStatus::Expired => "expired",
        VoucherStatus::Disabled => "disabled",
        VoucherStatus::Refunded => "refunded",
        VoucherStatus::Transferred => "transferred",
    }
}

const SELECT_COLUMNS: &str = r#"
    id, code, password, profile, validity_hours, data_limit_mb, price_cents,
    currency, status, customer_id, payment_id, device_id, created_at,
    activated_at, expires_at, sms_sent_at, provision_attempts,
    last_provision_error, needs_attention, status_reason, transferred_to,
    transferred_from, updated_at, version
"#;

#[async_trait]
impl VoucherRepository for PostgresVoucherRepository {
    async fn save(&self, voucher: &Voucher) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO vouchers (
                id, code, password, profile, validity_hours, data_limit_mb,
                price_cents, currency, status, customer_id, payment_id,
                device_id, created_at, activated_at, expires_at, sms_sent_at,
                provision_attempts, last_provision_error, needs_attention,
                status_reason, transferred_to, transferred_from, updated_at,
                version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                      $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
            "#,
        )
        .bind(voucher.id.as_uuid())
        .bind(voucher.code.as_str())
        .bind(voucher.password.as_str())
        .bind(&voucher.profile)
        .bind(voucher.validity_hours as i32)
        .bind(voucher.data_limit_mb.map(|v| v as i64))
        .bind(voucher.price_cents)
        .bind(&voucher.currency)
        .bind(status_to_string(voucher.status))
        .bind(voucher.customer_id.as_uuid())
        .bind(voucher.payment_id.as_ref().map(|id| id.as_uuid()))
        .bind(voucher.device_id.as_ref().map(|id| id.as_uuid()))
        .bind(voucher.created_at.as_datetime())
        .bind(voucher.activated_at.as_ref().map(Timestamp::as_datetime))
        .bind(voucher.expires_at.as_ref().map(Timestamp::as_datetime))
        .bind(voucher.sms_sent_at.as_ref().map(Timestamp::as_datetime))
        .bind(voucher.provision_attempts as i32)
        .bind(&voucher.last_provision_error)
        .bind(voucher.needs_attention)
        .bind(&voucher.status_reason)
        .bind(voucher.transferred_to.as_ref().map(|id| id.as_uuid()))
        .bind(voucher.transferred_from.as_ref().map(|id| id.as_uuid()))
        .bind(voucher.updated_at.as_datetime())
        .bind(voucher.version)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("vouchers_code_key") {
                    return DomainError::new(
                        ErrorCode::DuplicateVoucherCode,
                        "A voucher with this code already exists",
                    );
                }
            }
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save voucher: {e}"))
        })?;

        Ok(())
    }

    async fn update(&self, voucher: &Voucher) -> Result<Voucher, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE vouchers SET
                status = $3,
                activated_at = $4,
                expires_at = $5,
                sms_sent_at = $6,
                provision_attempts = $7,
                last_provision_error = $8,
                needs_attention = $9,
                status_reason = $10,
                transferred_to = $11,
                customer_id = $12,
                device_id = $13,
                updated_at = $14,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(voucher.id.as_uuid())
        .bind(voucher.version)
        .bind(status_to_string(voucher.status))
        .bind(voucher.activated_at.as_ref().map(Timestamp::as_datetime))
        .bind(voucher.expires_at.as_ref().map(Timestamp::as_datetime))
        .bind(voucher.sms_sent_at.as_ref().map(Timestamp::as_datetime))
        .bind(voucher.provision_attempts as i32)
        .bind(&voucher.last_provision_error)
        .bind(voucher.needs_attention)
        .bind(&voucher.status_reason)
        .bind(voucher.transferred_to.as_ref().map(|id| id.as_uuid()))
        .bind(voucher.customer_id.as_uuid())
        .bind(voucher.device_id.as_ref().map(|id| id.as_uuid()))
        .bind(voucher.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update voucher: {e}"))
        })?;

        if result.rows_affected() == 0 {
            // Either the voucher is gone or another writer bumped the
            // version. Disambiguate so callers can retry only the race.
            let exists: Option<VoucherRow> = sqlx::query_as(&format!(
                "SELECT {SELECT_COLUMNS} FROM vouchers WHERE id = $1"
            ))
            .bind(voucher.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Failed to re-read voucher: {e}"))
            })?;

            return Err(match exists {
                Some(_) => DomainError::new(
                    ErrorCode::VersionConflict,
                    "Voucher was modified concurrently",
                )
                .with_detail("voucher_id", voucher.id.to_string()),
                None => DomainError::new(ErrorCode::VoucherNotFound, "Voucher not found"),
            });
        }

        let mut updated = voucher.clone();
        updated.version += 1;
        Ok(updated)
    }

    async fn find_by_id(&self, id: &VoucherId) -> Result<Option<Voucher>, DomainError> {
        let row: Option<VoucherRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM vouchers WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find voucher: {e}"))
        })?;

        row.map(Voucher::try_from).transpose()
    }

    async fn find_by_code(&self, code: &VoucherCode) -> Result<Option<Voucher>, DomainError> {
        let row: Option<VoucherRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM vouchers WHERE code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find voucher: {e}"))
        })?;

        row.map(Voucher::try_from).transpose()
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<Voucher>, DomainError> {
        let row: Option<VoucherRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM vouchers WHERE payment_id = $1"
        ))
        .bind(payment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find voucher: {e}"))
        })?;

        row.map(Voucher::try_from).transpose()
    }

    async fn find_by_status(&self, status: VoucherStatus) -> Result<Vec<Voucher>, DomainError> {
        let rows: Vec<VoucherRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM vouchers WHERE status = $1 ORDER BY created_at"
        ))
        .bind(status_to_string(status))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to list vouchers: {e}"))
        })?;

        rows.into_iter().map(Voucher::try_from).collect()
    }

    async fn find_expired(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<Voucher>, DomainError> {
        let rows: Vec<VoucherRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM vouchers
            WHERE status = 'active' AND expires_at <= $1
            ORDER BY expires_at
            LIMIT $2
            "#
        ))
        .bind(now.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find expired vouchers: {e}"),
            )
        })?;

        rows.into_iter().map(Voucher::try_from).collect()
    }

    async fn find_stuck_pending(
        &self,
        max_attempts: u32,
        limit: u32,
    ) -> Result<Vec<Voucher>, DomainError> {
        let rows: Vec<VoucherRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM vouchers
            WHERE status = 'pending'
              AND provision_attempts > 0
              AND provision_attempts < $1
              AND NOT needs_attention
            ORDER BY updated_at
            LIMIT $2
            "#
        ))
        .bind(max_attempts as i32)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find stuck vouchers: {e}"),
            )
        })?;

        rows.into_iter().map(Voucher::try_from).collect()
    }

    async fn count_for_device(&self, device_id: &DeviceId) -> Result<u64, DomainError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM vouchers WHERE device_id = $1")
                .bind(device_id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to count vouchers: {e}"),
                    )
                })?;

        Ok(count as u64)
    }
}
