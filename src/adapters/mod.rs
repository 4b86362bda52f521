//! Adapters - concrete implementations of the ports.

pub mod crypto;
pub mod payments;
pub mod postgres;
pub mod registry;
pub mod routeros;
pub mod sms;
