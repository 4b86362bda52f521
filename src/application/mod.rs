//! Application layer: use-case handlers and long-running services.

pub mod handlers;
pub mod notification;
pub mod provisioning;
pub mod sweeper;

pub use notification::NotificationDispatcher;
pub use provisioning::{ProvisionError, ProvisionOutcome, ProvisioningCoordinator};
pub use sweeper::{ExpirySweeper, SweepReport};
