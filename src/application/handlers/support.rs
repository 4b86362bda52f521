//! Shared in-memory test doubles for handler tests.

use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::adapters::registry::DeviceRegistry;
use crate::adapters::sms::MockSmsSender;
use crate::application::notification::NotificationDispatcher;
use crate::application::provisioning::ProvisioningCoordinator;
use crate::config::CacheTtlConfig;
use crate::domain::device::{DeviceConfig, RouterDevice};
use crate::domain::foundation::{
    CustomerId, DeviceId, DomainError, ErrorCode, PaymentId, PhoneNumber, Timestamp, VoucherId,
};
use crate::domain::voucher::{Voucher, VoucherCode, VoucherStatus};
use crate::ports::{
    AttemptOperation, CommandResult, Customer, CustomerDirectory, DeviceRepository,
    NotificationKind, NotificationLog, NotificationRecord, ProvisioningAttempt,
    ProvisioningAttemptLog, RouterClient, RouterError, RouterRow, VoucherRepository,
};

/// In-memory voucher repository with real compare-and-set semantics.
#[derive(Default)]
pub struct InMemoryVoucherRepo {
    pub vouchers: Mutex<HashMap<VoucherId, Voucher>>,
}

impl InMemoryVoucherRepo {
    pub fn insert(&self, voucher: Voucher) {
        self.vouchers.lock().unwrap().insert(voucher.id, voucher);
    }

    pub fn get(&self, id: &VoucherId) -> Voucher {
        self.vouchers.lock().unwrap().get(id).unwrap().clone()
    }
}

#[async_trait]
impl VoucherRepository for InMemoryVoucherRepo {
    async fn save(&self, voucher: &Voucher) -> Result<(), DomainError> {
        let mut store = self.vouchers.lock().unwrap();
        if store.values().any(|v| v.code == voucher.code && v.id != voucher.id) {
            return Err(DomainError::new(
                ErrorCode::DuplicateVoucherCode,
                "A voucher with this code already exists",
            ));
        }
        store.insert(voucher.id, voucher.clone());
        Ok(())
    }

    async fn update(&self, voucher: &Voucher) -> Result<Voucher, DomainError> {
        let mut store = self.vouchers.lock().unwrap();
        let current = store
            .get(&voucher.id)
            .ok_or_else(|| DomainError::new(ErrorCode::VoucherNotFound, "Voucher not found"))?;
        if current.version != voucher.version {
            return Err(DomainError::new(
                ErrorCode::VersionConflict,
                "Voucher was modified concurrently",
            ));
        }
        let mut updated = voucher.clone();
        updated.version += 1;
        store.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn find_by_id(&self, id: &VoucherId) -> Result<Option<Voucher>, DomainError> {
        Ok(self.vouchers.lock().unwrap().get(id).cloned())
    }

    async fn find_by_code(&self, code: &VoucherCode) -> Result<Option<Voucher>, DomainError> {
        Ok(self
            .vouchers
            .lock()
            .unwrap()
            .values()
            .find(|v| v.code == *code)
            .cloned())
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<Voucher>, DomainError> {
        Ok(self
            .vouchers
            .lock()
            .unwrap()
            .values()
            .find(|v| v.payment_id.as_ref() == Some(payment_id))
            .cloned())
    }

    async fn find_by_status(&self, status: VoucherStatus) -> Result<Vec<Voucher>, DomainError> {
        Ok(self
            .vouchers
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.status == status)
            .cloned()
            .collect())
    }

    async fn find_expired(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<Voucher>, DomainError> {
        Ok(self
            .vouchers
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.status == VoucherStatus::Active && v.is_expired_at(&now))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_stuck_pending(
        &self,
        max_attempts: u32,
        limit: u32,
    ) -> Result<Vec<Voucher>, DomainError> {
        Ok(self
            .vouchers
            .lock()
            .unwrap()
            .values()
            .filter(|v| {
                v.status == VoucherStatus::Pending
                    && v.provision_attempts > 0
                    && v.provision_attempts < max_attempts
                    && !v.needs_attention
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_for_device(&self, device_id: &DeviceId) -> Result<u64, DomainError> {
        Ok(self
            .vouchers
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.device_id.as_ref() == Some(device_id))
            .count() as u64)
    }
}

/// In-memory device repository.
#[derive(Default)]
pub struct InMemoryDeviceRepo {
    pub devices: Mutex<HashMap<DeviceId, RouterDevice>>,
}

impl InMemoryDeviceRepo {
    pub fn insert(&self, device: RouterDevice) {
        self.devices.lock().unwrap().insert(device.id, device);
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepo {
    async fn save(&self, device: &RouterDevice) -> Result<(), DomainError> {
        let mut store = self.devices.lock().unwrap();
        if store.values().any(|d| d.name == device.name) {
            return Err(DomainError::new(
                ErrorCode::DuplicateDeviceName,
                "A device with this name already exists",
            ));
        }
        if store.values().any(|d| d.ip_address == device.ip_address) {
            return Err(DomainError::new(
                ErrorCode::DuplicateDeviceAddress,
                "A device with this IP address already exists",
            ));
        }
        store.insert(device.id, device.clone());
        Ok(())
    }

    async fn update(&self, device: &RouterDevice) -> Result<(), DomainError> {
        self.devices
            .lock()
            .unwrap()
            .insert(device.id, device.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &DeviceId) -> Result<Option<RouterDevice>, DomainError> {
        Ok(self.devices.lock().unwrap().get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<RouterDevice>, DomainError> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .values()
            .find(|d| d.name == name)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<RouterDevice>, DomainError> {
        Ok(self.devices.lock().unwrap().values().cloned().collect())
    }

    async fn delete(&self, id: &DeviceId) -> Result<(), DomainError> {
        self.devices
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DomainError::new(ErrorCode::DeviceNotFound, "Device not found"))
    }
}

/// Router stub: empty device, optional injected failure.
#[derive(Default)]
pub struct StubRouter {
    pub fail_with: Mutex<Option<RouterError>>,
    pub rows: Mutex<HashMap<String, Vec<RouterRow>>>,
}

impl StubRouter {
    pub fn fail_with(&self, err: RouterError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    pub fn recover(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    pub fn set_rows(&self, path: &str, rows: Vec<RouterRow>) {
        self.rows.lock().unwrap().insert(path.to_string(), rows);
    }
}

#[async_trait]
impl RouterClient for StubRouter {
    async fn query(
        &self,
        _device: &RouterDevice,
        path: &str,
        _filters: &[(String, String)],
        _fields: &[&str],
    ) -> Result<Vec<RouterRow>, RouterError> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    async fn execute(
        &self,
        _device: &RouterDevice,
        _path: &str,
        _params: &[(String, String)],
    ) -> Result<CommandResult, RouterError> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(CommandResult {
            provider_id: Some("*1".to_string()),
        })
    }
}

#[derive(Default)]
pub struct InMemoryAttemptLog {
    pub attempts: Mutex<Vec<ProvisioningAttempt>>,
}

#[async_trait]
impl ProvisioningAttemptLog for InMemoryAttemptLog {
    async fn append(&self, attempt: &ProvisioningAttempt) -> Result<(), DomainError> {
        self.attempts.lock().unwrap().push(attempt.clone());
        Ok(())
    }

    async fn find_success(
        &self,
        voucher_id: &VoucherId,
        device_id: &DeviceId,
    ) -> Result<Option<ProvisioningAttempt>, DomainError> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .find(|a| {
                a.voucher_id == *voucher_id
                    && a.device_id == *device_id
                    && a.operation == AttemptOperation::Provision
                    && a.outcome.is_success()
            })
            .cloned())
    }

    async fn find_for_voucher(
        &self,
        voucher_id: &VoucherId,
    ) -> Result<Vec<ProvisioningAttempt>, DomainError> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.voucher_id == *voucher_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationLog {
    pub records: Mutex<Vec<NotificationRecord>>,
}

#[async_trait]
impl NotificationLog for InMemoryNotificationLog {
    async fn contains(
        &self,
        voucher_id: &VoucherId,
        kind: NotificationKind,
    ) -> Result<bool, DomainError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.voucher_id == *voucher_id && r.kind == kind))
    }

    async fn record(&self, record: &NotificationRecord) -> Result<(), DomainError> {
        let mut records = self.records.lock().unwrap();
        if !records
            .iter()
            .any(|r| r.voucher_id == record.voucher_id && r.kind == record.kind)
        {
            records.push(record.clone());
        }
        Ok(())
    }
}

pub struct StaticDirectory {
    pub customer: Customer,
}

#[async_trait]
impl CustomerDirectory for StaticDirectory {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, DomainError> {
        if *id == self.customer.id {
            Ok(Some(self.customer.clone()))
        } else {
            Ok(None)
        }
    }
}

/// Fully wired application services over in-memory adapters.
pub struct World {
    pub router: Arc<StubRouter>,
    pub vouchers: Arc<InMemoryVoucherRepo>,
    pub devices: Arc<InMemoryDeviceRepo>,
    pub attempts: Arc<InMemoryAttemptLog>,
    pub notification_log: Arc<InMemoryNotificationLog>,
    pub sender: Arc<MockSmsSender>,
    pub registry: Arc<DeviceRegistry>,
    pub coordinator: Arc<ProvisioningCoordinator>,
    pub notifier: Arc<NotificationDispatcher>,
    pub customer: Customer,
    pub device: RouterDevice,
}

impl World {
    pub fn new() -> Self {
        let router = Arc::new(StubRouter::default());
        let vouchers = Arc::new(InMemoryVoucherRepo::default());
        let devices = Arc::new(InMemoryDeviceRepo::default());
        let attempts = Arc::new(InMemoryAttemptLog::default());
        let notification_log = Arc::new(InMemoryNotificationLog::default());
        let sender = Arc::new(MockSmsSender::new());

        let customer = Customer {
            id: CustomerId::new(),
            name: "Amina".to_string(),
            phone: PhoneNumber::parse("+254712345678").unwrap(),
        };

        let device_config = DeviceConfig::new(
            "gateway-01",
            "192.168.88.1",
            8728,
            "api",
            SecretString::new("pw".to_string()),
        )
        .validate()
        .unwrap();
        let device = RouterDevice::from_config(device_config);
        devices.insert(device.clone());

        let registry = Arc::new(DeviceRegistry::new(
            router.clone(),
            devices.clone(),
            CacheTtlConfig::default(),
        ));
        let coordinator = Arc::new(ProvisioningCoordinator::new(
            router.clone(),
            devices.clone(),
            attempts.clone(),
            registry.clone(),
        ));
        let notifier = Arc::new(NotificationDispatcher::new(
            Arc::new(StaticDirectory {
                customer: customer.clone(),
            }),
            sender.clone(),
            notification_log.clone(),
            vouchers.clone(),
        ));

        Self {
            router,
            vouchers,
            devices,
            attempts,
            notification_log,
            sender,
            registry,
            coordinator,
            notifier,
            customer,
            device,
        }
    }
}
