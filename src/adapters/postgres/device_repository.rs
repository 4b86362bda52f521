//! PostgreSQL implementation of DeviceRepository.
//!
//! Credentials cross this boundary encrypted: the cipher runs on every
//! write before the bind and on every read before the aggregate is built.
//! Plaintext never reaches a column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use sqlx::PgPool;
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::device::{DevicePassword, DeviceStatus, RouterDevice};
use crate::domain::foundation::{DeviceId, DomainError, ErrorCode, Timestamp};
use crate::ports::{CredentialCipher, DeviceRepository};

/// PostgreSQL implementation of the DeviceRepository port.
pub struct PostgresDeviceRepository {
    pool: PgPool,
    cipher: Arc<dyn CredentialCipher>,
}

impl PostgresDeviceRepository {
    pub fn new(pool: PgPool, cipher: Arc<dyn CredentialCipher>) -> Self {
        Self { pool, cipher }
    }

    fn encrypt_password(&self, device: &RouterDevice) -> Result<String, DomainError> {
        let secret = device.password().ok_or_else(|| {
            DomainError::new(
                ErrorCode::CryptoError,
                "Device has no credential to persist",
            )
        })?;
        self.cipher
            .encrypt(secret)
            .map_err(|e| DomainError::new(ErrorCode::CryptoError, e.to_string()))
    }

    fn row_to_device(&self, row: DeviceRow) -> Result<RouterDevice, DomainError> {
        let password: SecretString = self
            .cipher
            .decrypt(&row.password_encrypted)
            .map_err(|e| DomainError::new(ErrorCode::CryptoError, e.to_string()))?;

        let ip_address: IpAddr = row.ip_address.parse().map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid stored IP address: {}", row.ip_address),
            )
        })?;

        Ok(RouterDevice {
            id: DeviceId::from_uuid(row.id),
            name: row.name,
            ip_address,
            api_port: row.api_port as u16,
            username: row.username,
            password: DevicePassword::new(password),
            status: parse_status(&row.status)?,
            last_seen: row.last_seen.map(Timestamp::from_datetime),
            uptime_seconds: row.uptime_seconds.map(|v| v as u64),
            last_error: row.last_error,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Database row representation of a device.
#[derive(Debug, sqlx::FromRow)]
struct DeviceRow {
    id: Uuid,
    name: String,
    ip_address: String,
    api_port: i32,
    username: String,
    password_encrypted: String,
    status: String,
    last_seen: Option<DateTime<Utc>>,
    uptime_seconds: Option<i64>,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<DeviceStatus, DomainError> {
    match s {
        "online" => Ok(DeviceStatus::Online),
        "offline" => Ok(DeviceStatus::Offline),
        "error" => Ok(DeviceStatus::Error),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid device status value: {s}"),
        )),
    }
}

fn status_to_string(status: DeviceStatus) -> &'static str {
    match status {
        DeviceStatus::Online => "online",
        DeviceStatus::Offline => "offline",
        DeviceStatus::Error => "error",
    }
}

const SELECT_COLUMNS: &str = r#"
    id, name, ip_address, api_port, username, password_encrypted, status,
    last_seen, uptime_seconds, last_error, created_at, updated_at
"#;

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    async fn save(&self, device: &RouterDevice) -> Result<(), DomainError> {
        let encrypted = self.encrypt_password(device)?;

        sqlx::query(
            r#"
            INSERT INTO router_devices (
                id, name, ip_address, api_port, username, password_encrypted,
                status, last_seen, uptime_seconds, last_error, created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(device.id.as_uuid())
        .bind(&device.name)
        .bind(device.ip_address.to_string())
        .bind(i32::from(device.api_port))
        .bind(&device.username)
        .bind(&encrypted)
        .bind(status_to_string(device.status))
        .bind(device.last_seen.as_ref().map(Timestamp::as_datetime))
        .bind(device.uptime_seconds.map(|v| v as i64))
        .bind(&device.last_error)
        .bind(device.created_at.as_datetime())
        .bind(device.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                match db_err.constraint() {
                    Some("router_devices_name_key") => {
                        return DomainError::new(
                            ErrorCode::DuplicateDeviceName,
                            "A device with this name already exists",
                        )
                    }
                    Some("router_devices_ip_address_key") => {
                        return DomainError::new(
                            ErrorCode::DuplicateDeviceAddress,
                            "A device with this IP address already exists",
                        )
                    }
                    _ => {}
                }
            }
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to save device: {e}"))
        })?;

        Ok(())
    }

    async fn update(&self, device: &RouterDevice) -> Result<(), DomainError> {
        let encrypted = self.encrypt_password(device)?;

        let result = sqlx::query(
            r#"
            UPDATE router_devices SET
                name = $2,
                ip_address = $3,
                api_port = $4,
                username = $5,
                password_encrypted = $6,
                status = $7,
                last_seen = $8,
                uptime_seconds = $9,
                last_error = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(device.id.as_uuid())
        .bind(&device.name)
        .bind(device.ip_address.to_string())
        .bind(i32::from(device.api_port))
        .bind(&device.username)
        .bind(&encrypted)
        .bind(status_to_string(device.status))
        .bind(device.last_seen.as_ref().map(Timestamp::as_datetime))
        .bind(device.uptime_seconds.map(|v| v as i64))
        .bind(&device.last_error)
        .bind(device.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update device: {e}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::DeviceNotFound,
                "Device not found",
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &DeviceId) -> Result<Option<RouterDevice>, DomainError> {
        let row: Option<DeviceRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM router_devices WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find device: {e}"))
        })?;

        row.map(|r| self.row_to_device(r)).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<RouterDevice>, DomainError> {
        let row: Option<DeviceRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM router_devices WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find device: {e}"))
        })?;

        row.map(|r| self.row_to_device(r)).transpose()
    }

    async fn list(&self) -> Result<Vec<RouterDevice>, DomainError> {
        let rows: Vec<DeviceRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM router_devices ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to list devices: {e}"))
        })?;

        rows.into_iter().map(|r| self.row_to_device(r)).collect()
    }

    async fn delete(&self, id: &DeviceId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM router_devices WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Failed to delete device: {e}"))
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::DeviceNotFound,
                "Device not found",
            ));
        }

        Ok(())
    }
}
