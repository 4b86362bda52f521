//! Foundation value objects and shared domain primitives.

mod errors;
mod ids;
mod phone;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AttemptId, CustomerId, DeviceId, PaymentId, VoucherId};
pub use phone::PhoneNumber;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
