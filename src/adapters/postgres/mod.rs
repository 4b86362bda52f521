//! PostgreSQL adapters - database implementations of the repository ports.

mod attempt_log;
mod customer_directory;
mod device_repository;
mod notification_log;
mod payment_repository;
mod pool;
mod voucher_repository;

pub use attempt_log::PostgresAttemptLog;
pub use customer_directory::PostgresCustomerDirectory;
pub use device_repository::PostgresDeviceRepository;
pub use notification_log::PostgresNotificationLog;
pub use payment_repository::PostgresPaymentRepository;
pub use pool::connect;
pub use voucher_repository::PostgresVoucherRepository;
