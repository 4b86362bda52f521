//! Voucher domain: aggregate, status state machine, lifecycle events, and
//! code/password value objects.

mod aggregate;
mod code;
mod errors;
mod events;
mod status;
mod usage;

pub use aggregate::{Applied, Voucher, VoucherSpec};
pub use code::{VoucherCode, VoucherPassword};
pub use errors::VoucherError;
pub use events::VoucherEvent;
pub use status::VoucherStatus;
pub use usage::UsageSnapshot;
