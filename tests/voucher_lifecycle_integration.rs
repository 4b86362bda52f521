//! Integration tests for the voucher lifecycle.
//!
//! These tests drive the full path a voucher takes in production:
//! 1. Payment webhook mints a voucher and provisions the hotspot user
//! 2. Customer receives exactly one credentials SMS
//! 3. The sweeper expires the voucher once its window lapses
//! 4. Router outages are absorbed: the voucher stays pending and a later
//!    sweep activates it
//!
//! Uses in-memory implementations of every port; no router, database, or
//! SMS gateway is required.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use netvend::adapters::registry::DeviceRegistry;
use netvend::adapters::sms::MockSmsSender;
use netvend::application::handlers::voucher::{
    PurchaseCompletedCommand, PurchaseCompletedHandler, RefundVoucherCommand,
    RefundVoucherHandler,
};
use netvend::application::{ExpirySweeper, NotificationDispatcher, ProvisioningCoordinator};
use netvend::config::{CacheTtlConfig, SweeperConfig};
use netvend::domain::device::{DeviceConfig, RouterDevice};
use netvend::domain::foundation::{
    CustomerId, DeviceId, DomainError, ErrorCode, PaymentId, PhoneNumber, Timestamp, VoucherId,
};
use netvend::domain::voucher::{Voucher, VoucherCode, VoucherStatus};
use netvend::ports::{
    AttemptOperation, CommandResult, Customer, CustomerDirectory, DeviceRepository,
    NotificationKind, NotificationLog, NotificationRecord, PaymentError, PaymentGateway,
    PaymentRecord, PaymentRepository, PaymentRequest, PaymentResult, PaymentState,
    ProvisioningAttempt, ProvisioningAttemptLog, RouterClient, RouterError, RouterRow,
    VoucherRepository,
};
use secrecy::SecretString;

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Default)]
struct TestVoucherRepo {
    vouchers: Mutex<HashMap<VoucherId, Voucher>>,
}

#[async_trait]
impl VoucherRepository for TestVoucherRepo {
    async fn save(&self, voucher: &Voucher) -> Result<(), DomainError> {
        self.vouchers
            .lock()
            .unwrap()
            .insert(voucher.id, voucher.clone());
        Ok(())
    }

    async fn update(&self, voucher: &Voucher) -> Result<Voucher, DomainError> {
        let mut store = self.vouchers.lock().unwrap();
        let current = store
            .get(&voucher.id)
            .ok_or_else(|| DomainError::new(ErrorCode::VoucherNotFound, "not found"))?;
        if current.version != voucher.version {
            return Err(DomainError::new(
                ErrorCode::VersionConflict,
                "concurrent update",
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

struct TestDeviceRepo {
    devices: Mutex<HashMap<DeviceId, RouterDevice>>,
}

#[async_trait]
impl DeviceRepository for TestDeviceRepo {
    async fn save(&self, device: &RouterDevice) -> Result<(), DomainError> {
        self.devices
            .lock()
            .unwrap()
            .insert(device.id, device.clone());
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
        self.devices.lock().unwrap().remove(id);
        Ok(())
    }
}

/// Scriptable router: records executed commands, optionally fails.
#[derive(Default)]
struct TestRouter {
    fail_with: Mutex<Option<RouterError>>,
    executed: Mutex<Vec<String>>,
}

impl TestRouter {
    fn fail_with(&self, err: RouterError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    fn recover(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    fn executed_paths(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RouterClient for TestRouter {
    async fn query(
        &self,
        _device: &RouterDevice,
        _path: &str,
        _filters: &[(String, String)],
        _fields: &[&str],
    ) -> Result<Vec<RouterRow>, RouterError> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(vec![])
    }

    async fn execute(
        &self,
        _device: &RouterDevice,
        path: &str,
        _params: &[(String, String)],
    ) -> Result<CommandResult, RouterError> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        self.executed.lock().unwrap().push(path.to_string());
        Ok(CommandResult {
            provider_id: Some("*1".to_string()),
        })
    }
}

#[derive(Default)]
struct TestAttemptLog {
    attempts: Mutex<Vec<ProvisioningAttempt>>,
}

#[async_trait]
impl ProvisioningAttemptLog for TestAttemptLog {
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
struct TestNotificationLog {
    records: Mutex<Vec<NotificationRecord>>,
}

#[async_trait]
impl NotificationLog for TestNotificationLog {
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
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct TestDirectory {
    customer: Customer,
}

#[async_trait]
impl CustomerDirectory for TestDirectory {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, DomainError> {
        if *id == self.customer.id {
            Ok(Some(self.customer.clone()))
        } else {
            Ok(None)
        }
    }
}

#[derive(Default)]
struct TestPaymentRepo {
    payments: Mutex<Vec<PaymentRecord>>,
}

#[async_trait]
impl PaymentRepository for TestPaymentRepo {
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == *id)
            .cloned())
    }

    async fn update_state(
        &self,
        id: &PaymentId,
        state: PaymentState,
    ) -> Result<(), DomainError> {
        let mut payments = self.payments.lock().unwrap();
        let payment = payments
            .iter_mut()
            .find(|p| p.id == *id)
            .ok_or_else(|| DomainError::new(ErrorCode::PaymentNotFound, "not found"))?;
        payment.state = state;
        Ok(())
    }
}

#[derive(Default)]
struct TestGateway {
    reversed: Mutex<Vec<String>>,
}

#[async_trait]
impl PaymentGateway for TestGateway {
    async fn initialize_payment(
        &self,
        _request: &PaymentRequest,
    ) -> Result<PaymentResult, PaymentError> {
        Err(PaymentError::GatewayUnreachable("not under test".to_string()))
    }

    async fn verify_payment(&self, _reference: &str) -> Result<PaymentResult, PaymentError> {
        Err(PaymentError::GatewayUnreachable("not under test".to_string()))
    }

    async fn reverse_payment(&self, reference: &str) -> Result<PaymentResult, PaymentError> {
        self.reversed.lock().unwrap().push(reference.to_string());
        Ok(PaymentResult {
            payment_id: PaymentId::new(),
            state: PaymentState::Reversed,
            reference: reference.to_string(),
        })
    }
}

// =============================================================================
// Wiring
// =============================================================================

struct TestStack {
    router: Arc<TestRouter>,
    vouchers: Arc<TestVoucherRepo>,
    payments: Arc<TestPaymentRepo>,
    gateway: Arc<TestGateway>,
    sender: Arc<MockSmsSender>,
    purchase: PurchaseCompletedHandler,
    refund: RefundVoucherHandler,
    sweeper: ExpirySweeper,
    customer: Customer,
    device: RouterDevice,
}

fn stack() -> TestStack {
    let router = Arc::new(TestRouter::default());
    let vouchers = Arc::new(TestVoucherRepo::default());
    let payments = Arc::new(TestPaymentRepo::default());
    let gateway = Arc::new(TestGateway::default());
    let attempts = Arc::new(TestAttemptLog::default());
    let notification_log = Arc::new(TestNotificationLog::default());
    let sender = Arc::new(MockSmsSender::new());

    let customer = Customer {
        id: CustomerId::new(),
        name: "Amina".to_string(),
        phone: PhoneNumber::parse("+254712345678").unwrap(),
    };

    let device = RouterDevice::from_config(
        DeviceConfig::new(
            "gateway-01",
            "192.168.88.1",
            8728,
            "api",
            SecretString::new("pw".to_string()),
        )
        .validate()
        .unwrap(),
    );
    let devices = Arc::new(TestDeviceRepo {
        devices: Mutex::new(HashMap::from([(device.id, device.clone())])),
    });

    let registry = Arc::new(DeviceRegistry::new(
        router.clone(),
        devices.clone(),
        CacheTtlConfig::default(),
    ));
    let coordinator = Arc::new(ProvisioningCoordinator::new(
        router.clone(),
        devices.clone(),
        attempts.clone(),
        registry,
    ));
    let notifier = Arc::new(NotificationDispatcher::new(
        Arc::new(TestDirectory {
            customer: customer.clone(),
        }),
        sender.clone(),
        notification_log,
        vouchers.clone(),
    ));

    let purchase = PurchaseCompletedHandler::new(
        vouchers.clone(),
        payments.clone(),
        devices.clone(),
        coordinator.clone(),
        notifier.clone(),
    );
    let refund = RefundVoucherHandler::new(
        vouchers.clone(),
        payments.clone(),
        gateway.clone(),
        devices.clone(),
        coordinator.clone(),
        notifier.clone(),
    );
    let sweeper = ExpirySweeper::new(
        vouchers.clone(),
        devices.clone(),
        coordinator,
        notifier,
        SweeperConfig::default(),
    );

    TestStack {
        router,
        vouchers,
        payments,
        gateway,
        sender,
        purchase,
        refund,
        sweeper,
        customer,
        device,
    }
}

fn seed_payment(stack: &TestStack, validity_hours: u32) -> PaymentId {
    let payment = PaymentRecord {
        id: PaymentId::new(),
        customer_id: stack.customer.id,
        device_id: stack.device.id,
        profile: "24h-basic".to_string(),
        validity_hours,
        data_limit_mb: Some(1024),
        amount_cents: 5_000,
        currency: "KES".to_string(),
        reference: "mp-100".to_string(),
        state: PaymentState::Completed,
        created_at: Timestamp::now(),
    };
    let id = payment.id;
    stack.payments.payments.lock().unwrap().push(payment);
    id
}

/// Backdates an active voucher so its window has already lapsed.
fn force_expiry(stack: &TestStack, voucher_id: &VoucherId) {
    let mut store = stack.vouchers.vouchers.lock().unwrap();
    let voucher = store.get_mut(voucher_id).unwrap();
    voucher.activated_at = Some(Timestamp::now().minus_hours(48));
    voucher.expires_at = Some(Timestamp::now().minus_hours(24));
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn purchase_to_expiry_full_lifecycle() {
    let stack = stack();
    let payment_id = seed_payment(&stack, 24);

    // Webhook fires: voucher minted, provisioned, customer notified.
    let result = stack
        .purchase
        .handle(PurchaseCompletedCommand { payment_id })
        .await
        .unwrap();
    assert!(result.activated);
    assert_eq!(result.voucher.status, VoucherStatus::Active);
    assert_eq!(
        stack.router.executed_paths(),
        ["/ip/hotspot/user/add".to_string()]
    );

    let sent = stack.sender.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains(result.voucher.code.as_str()));

    // Time passes; the sweeper retires the voucher and tells the customer.
    force_expiry(&stack, &result.voucher.id);
    let report = stack.sweeper.sweep().await.unwrap();
    assert_eq!(report.expired, 1);

    let voucher = stack
        .vouchers
        .find_by_id(&result.voucher.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(voucher.status, VoucherStatus::Expired);

    let sent = stack.sender.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].body.contains("expired"));

    // A second sweep finds nothing to do.
    let report = stack.sweeper.sweep().await.unwrap();
    assert_eq!(report, Default::default());
}

#[tokio::test]
async fn router_outage_is_absorbed_and_recovered_by_the_sweeper() {
    let stack = stack();
    let payment_id = seed_payment(&stack, 24);
    stack
        .router
        .fail_with(RouterError::Unreachable("connection refused".to_string()));

    // Webhook succeeds even though the router is down.
    let result = stack
        .purchase
        .handle(PurchaseCompletedCommand { payment_id })
        .await
        .unwrap();
    assert!(!result.activated);
    assert_eq!(result.voucher.status, VoucherStatus::Pending);
    assert!(stack.sender.sent().is_empty());

    // Sweeps while the router is still down keep the voucher pending.
    stack.sweeper.sweep().await.unwrap();
    let voucher = stack
        .vouchers
        .find_by_id(&result.voucher.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(voucher.status, VoucherStatus::Pending);
    assert!(voucher.provision_attempts >= 2);

    // Router comes back; the next sweep activates and notifies.
    stack.router.recover();
    let report = stack.sweeper.sweep().await.unwrap();
    assert_eq!(report.activated, 1);

    let voucher = stack
        .vouchers
        .find_by_id(&result.voucher.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(voucher.status, VoucherStatus::Active);
    assert!(voucher.expires_at.is_some());
    assert_eq!(stack.sender.sent().len(), 1);
}

#[tokio::test]
async fn retry_ceiling_flags_the_voucher_for_operators() {
    let stack = stack();
    let payment_id = seed_payment(&stack, 24);
    stack
        .router
        .fail_with(RouterError::Timeout("read timed out".to_string()));

    let result = stack
        .purchase
        .handle(PurchaseCompletedCommand { payment_id })
        .await
        .unwrap();

    // Default ceiling is 5 attempts; the webhook burned one already.
    for _ in 0..SweeperConfig::default().max_provision_attempts {
        stack.sweeper.sweep().await.unwrap();
    }

    let voucher = stack
        .vouchers
        .find_by_id(&result.voucher.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(voucher.status, VoucherStatus::Pending);
    assert!(voucher.needs_attention);
    assert!(voucher.provision_attempts >= SweeperConfig::default().max_provision_attempts);

    // Flagged vouchers are off the sweeper's retry list.
    let report = stack.sweeper.sweep().await.unwrap();
    assert_eq!(report.retried, 0);
}

#[tokio::test]
async fn refund_beats_the_sweeper_to_an_expiring_voucher() {
    let stack = stack();
    let payment_id = seed_payment(&stack, 24);

    let result = stack
        .purchase
        .handle(PurchaseCompletedCommand { payment_id })
        .await
        .unwrap();
    force_expiry(&stack, &result.voucher.id);

    // The refund lands first and wins the conditional update.
    let refunded = stack
        .refund
        .handle(RefundVoucherCommand {
            voucher_id: result.voucher.id,
            reason: "customer complaint".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(refunded.voucher.status, VoucherStatus::Refunded);
    assert_eq!(
        stack.gateway.reversed.lock().unwrap().as_slice(),
        ["mp-100".to_string()]
    );
    assert_eq!(
        stack.payments.payments.lock().unwrap()[0].state,
        PaymentState::Reversed
    );

    // The sweep that would have expired it now finds nothing.
    let report = stack.sweeper.sweep().await.unwrap();
    assert_eq!(report.expired, 0);

    let voucher = stack
        .vouchers
        .find_by_id(&result.voucher.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(voucher.status, VoucherStatus::Refunded, "refund sticks");
}
