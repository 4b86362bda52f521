//! Domain layer: aggregates, value objects, and state machines.
//!
//! The domain is side-effect free except for its own field mutation; all
//! I/O lives behind ports and in the application layer.

pub mod device;
pub mod foundation;
pub mod voucher;
