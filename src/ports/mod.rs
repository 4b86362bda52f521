//! Ports: async trait contracts between the application core and the
//! outside world. Adapters implement these; handlers and services depend
//! only on the traits.

mod attempt_log;
mod credential_cipher;
mod customer_directory;
mod device_repository;
mod notification_log;
mod notification_sender;
mod payment_gateway;
mod payment_repository;
mod router_client;
mod voucher_repository;

pub use attempt_log::{
    AttemptOperation, AttemptOutcome, ProvisioningAttempt, ProvisioningAttemptLog,
};
pub use credential_cipher::{CipherError, CredentialCipher};
pub use customer_directory::{Customer, CustomerDirectory};
pub use device_repository::DeviceRepository;
pub use notification_log::{NotificationKind, NotificationLog, NotificationRecord};
pub use notification_sender::{NotificationError, NotificationSender, SendReceipt};
pub use payment_gateway::{
    PaymentError, PaymentGateway, PaymentRequest, PaymentResult, PaymentState,
};
pub use payment_repository::{PaymentRecord, PaymentRepository};
pub use router_client::{CommandResult, RouterClient, RouterError, RouterRow};
pub use voucher_repository::VoucherRepository;
