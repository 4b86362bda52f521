//! GetVoucherUsageHandler - live usage snapshot for one voucher.
//!
//! Reads go through the [`DeviceRegistry`] cache, so a dashboard
//! polling this endpoint does not hammer the router. Counters come from
//! the hotspot user record (`bytes-in` + `bytes-out`); session count
//! from `/ip/hotspot/active` filtered by username.

use std::sync::Arc;

use crate::adapters::registry::DeviceRegistry;
use crate::domain::device::RouterDevice;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::voucher::{UsageSnapshot, Voucher, VoucherCode, VoucherStatus};
use crate::ports::{DeviceRepository, VoucherRepository};

/// Query for a voucher's usage.
#[derive(Debug, Clone)]
pub struct GetVoucherUsageQuery {
    pub code: VoucherCode,
}

/// Result pairing the voucher with its live usage.
#[derive(Debug, Clone)]
pub struct GetVoucherUsageResult {
    pub voucher: Voucher,
    pub usage: UsageSnapshot,
}

/// Handler for usage queries.
pub struct GetVoucherUsageHandler {
    vouchers: Arc<dyn VoucherRepository>,
    devices: Arc<dyn DeviceRepository>,
    registry: Arc<DeviceRegistry>,
}

impl GetVoucherUsageHandler {
    pub fn new(
        vouchers: Arc<dyn VoucherRepository>,
        devices: Arc<dyn DeviceRepository>,
        registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            vouchers,
            devices,
            registry,
        }
    }

    pub async fn handle(
        &self,
        query: GetVoucherUsageQuery,
    ) -> Result<GetVoucherUsageResult, DomainError> {
        let voucher = self
            .vouchers
            .find_by_code(&query.code)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::VoucherNotFound, "Voucher not found")
                    .with_detail("code", query.code.to_string())
            })?;

        let device = self.load_device(&voucher).await?;

        let user_row = self
            .registry
            .hotspot_user(&device, voucher.code.as_str())
            .await
            .map_err(DomainError::from)?;
        let total_data_used_bytes = user_row
            .as_ref()
            .map(|row| {
                row.get_parsed::<u64>("bytes-in").unwrap_or(0)
                    + row.get_parsed::<u64>("bytes-out").unwrap_or(0)
            })
            .unwrap_or(0);

        let active_connections = self
            .registry
            .active_users(&device)
            .await
            .map_err(DomainError::from)?
            .iter()
            .filter(|row| row.get("user") == Some(voucher.code.as_str()))
            .count() as u32;

        let usage = UsageSnapshot {
            active_connections,
            total_data_used_bytes,
            is_expired: voucher.is_expired_at(&Timestamp::now()),
            is_active: voucher.status == VoucherStatus::Active,
            data_usage_percentage: voucher.data_usage_percentage(total_data_used_bytes),
        };

        Ok(GetVoucherUsageResult { voucher, usage })
    }

    async fn load_device(&self, voucher: &Voucher) -> Result<RouterDevice, DomainError> {
        let device_id = voucher.device_id.ok_or_else(|| {
            DomainError::new(ErrorCode::DeviceNotFound, "Voucher has no target device")
                .with_detail("voucher_id", voucher.id.to_string())
        })?;
        self.devices.find_by_id(&device_id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::DeviceNotFound, "Target device not found")
                .with_detail("device_id", device_id.to_string())
        })
    }
}
