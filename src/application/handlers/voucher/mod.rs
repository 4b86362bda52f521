//! Voucher lifecycle command and query handlers.

mod admin_disable;
mod get_usage;
mod purchase_completed;
mod refund;
mod resend_notification;
mod transfer;

pub use admin_disable::{AdminDisableCommand, AdminDisableHandler};
pub use get_usage::{GetVoucherUsageHandler, GetVoucherUsageQuery, GetVoucherUsageResult};
pub use purchase_completed::{
    PurchaseCompletedCommand, PurchaseCompletedHandler, PurchaseCompletedResult,
};
pub use refund::{RefundVoucherCommand, RefundVoucherHandler, RefundVoucherResult};
pub use resend_notification::{ResendNotificationCommand, ResendNotificationHandler};
pub use transfer::{TransferVoucherCommand, TransferVoucherHandler, TransferVoucherResult};
