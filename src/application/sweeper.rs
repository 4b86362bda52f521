//! ExpirySweeper - periodic expiry and provisioning-retry passes.
//!
//! Two passes per sweep. Pass one retires active vouchers whose validity
//! window has lapsed; only the sweeper ever moves active to expired. Pass
//! two re-attempts stuck pending vouchers below the configured attempt
//! ceiling, driving successes through the full activate-and-notify path
//! and flagging the rest for operators.
//!
//! Concurrent sweeps are safe: transitions are idempotent and every write
//! is a compare-and-set, so when two sweepers race over the same voucher
//! exactly one wins and the other observes a version conflict and moves on.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::notification::NotificationDispatcher;
use crate::application::provisioning::{ProvisionOutcome, ProvisioningCoordinator};
use crate::config::SweeperConfig;
use crate::domain::device::RouterDevice;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::voucher::{Voucher, VoucherEvent};
use crate::ports::{DeviceRepository, NotificationKind, VoucherRepository};

/// Counters from one sweep invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Vouchers moved active → expired.
    pub expired: u32,
    /// Stuck pending vouchers re-attempted.
    pub retried: u32,
    /// Re-attempts that ended in activation.
    pub activated: u32,
    /// Vouchers flagged for operator attention.
    pub flagged: u32,
    /// Vouchers skipped because of errors (including lost races).
    pub errors: u32,
}

/// Periodic lifecycle maintenance over the voucher population.
pub struct ExpirySweeper {
    vouchers: Arc<dyn VoucherRepository>,
    devices: Arc<dyn DeviceRepository>,
    coordinator: Arc<ProvisioningCoordinator>,
    notifier: Arc<NotificationDispatcher>,
    config: SweeperConfig,
}

impl ExpirySweeper {
    pub fn new(
        vouchers: Arc<dyn VoucherRepository>,
        devices: Arc<dyn DeviceRepository>,
        coordinator: Arc<ProvisioningCoordinator>,
        notifier: Arc<NotificationDispatcher>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            vouchers,
            devices,
            coordinator,
            notifier,
            config,
        }
    }

    /// Runs sweeps forever at the configured interval.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.interval());
        loop {
            ticker.tick().await;
            match self.sweep().await {
                Ok(report) => info!(?report, "sweep complete"),
                Err(e) => warn!(error = %e, "sweep failed"),
            }
        }
    }

    /// One full sweep: expiry pass, then retry pass.
    pub async fn sweep(&self) -> Result<SweepReport, DomainError> {
        let mut report = SweepReport::default();
        let now = Timestamp::now();

        self.expire_lapsed(now, &mut report).await?;
        self.retry_stuck_pending(now, &mut report).await?;

        Ok(report)
    }

    async fn expire_lapsed(
        &self,
        now: Timestamp,
        report: &mut SweepReport,
    ) -> Result<(), DomainError> {
        let lapsed = self
            .vouchers
            .find_expired(now, self.config.batch_size)
            .await?;

        for voucher in lapsed {
            match self.expire_one(voucher, now).await {
                Ok(true) => report.expired += 1,
                Ok(false) => report.errors += 1,
                Err(e) => {
                    warn!(error = %e, "expiry pass error");
                    report.errors += 1;
                }
            }
        }
        Ok(())
    }

    /// Returns Ok(true) when this sweeper expired the voucher, Ok(false)
    /// when a concurrent writer got there first.
    async fn expire_one(&self, mut voucher: Voucher, now: Timestamp) -> Result<bool, DomainError> {
        // Access removal is best effort; the device enforces limit-uptime
        // on its own, so an unreachable router never blocks expiry.
        if let Some(device) = self.device_for(&voucher).await? {
            if let Err(e) = self.coordinator.deprovision(&voucher, &device).await {
                warn!(voucher = %voucher.code, error = %e, "deprovision during expiry failed");
            }
        }

        voucher
            .apply(&VoucherEvent::ExpirySwept { at: now })
            .map_err(DomainError::from)?;

        match self.vouchers.update(&voucher).await {
            Ok(updated) => {
                self.notify_best_effort(&updated, NotificationKind::Expired)
                    .await;
                Ok(true)
            }
            Err(e) if e.code == ErrorCode::VersionConflict => {
                debug!(voucher = %voucher.code, "lost expiry race, skipping");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn retry_stuck_pending(
        &self,
        now: Timestamp,
        report: &mut SweepReport,
    ) -> Result<(), DomainError> {
        let stuck = self
            .vouchers
            .find_stuck_pending(self.config.max_provision_attempts, self.config.batch_size)
            .await?;

        for voucher in stuck {
            report.retried += 1;
            if let Err(e) = self.retry_one(voucher, now, report).await {
                warn!(error = %e, "retry pass error");
                report.errors += 1;
            }
        }
        Ok(())
    }

    async fn retry_one(
        &self,
        mut voucher: Voucher,
        now: Timestamp,
        report: &mut SweepReport,
    ) -> Result<(), DomainError> {
        let Some(device) = self.device_for(&voucher).await? else {
            voucher.flag_for_attention();
            self.vouchers.update(&voucher).await?;
            report.flagged += 1;
            warn!(voucher = %voucher.code, "no device for retry, flagged");
            return Ok(());
        };

        match self.coordinator.provision(&voucher, &device).await {
            Ok(ProvisionOutcome::Provisioned { .. })
            | Ok(ProvisionOutcome::AlreadyProvisioned) => {
                voucher
                    .apply(&VoucherEvent::ProvisioningSucceeded { at: now })
                    .map_err(DomainError::from)?;
                let updated = self.vouchers.update(&voucher).await?;
                report.activated += 1;
                self.notify_best_effort(&updated, NotificationKind::Activated)
                    .await;
            }
            Err(e) => {
                voucher
                    .apply(&VoucherEvent::ProvisioningFailed {
                        error: e.to_string(),
                    })
                    .map_err(DomainError::from)?;

                let exhausted =
                    voucher.provision_attempts >= self.config.max_provision_attempts;
                if !e.is_retryable() || exhausted {
                    voucher.flag_for_attention();
                    report.flagged += 1;
                    warn!(
                        voucher = %voucher.code,
                        attempts = voucher.provision_attempts,
                        error = %e,
                        "provisioning abandoned, flagged for attention"
                    );
                }
                self.vouchers.update(&voucher).await?;
            }
        }
        Ok(())
    }

    async fn device_for(&self, voucher: &Voucher) -> Result<Option<RouterDevice>, DomainError> {
        match &voucher.device_id {
            Some(id) => self.devices.find_by_id(id).await,
            None => Ok(None),
        }
    }

    /// Notification failures never fail a sweep; the dedup ledger lets the
    /// next pass (or an explicit resend) pick them up.
    async fn notify_best_effort(&self, voucher: &Voucher, kind: NotificationKind) {
        if let Err(e) = self.notifier.dispatch(voucher, kind).await {
            warn!(voucher = %voucher.code, %kind, error = %e, "notification deferred");
        }
    }
}
