//! Command and query handlers, one module per aggregate.

pub mod device;
pub mod voucher;

#[cfg(test)]
pub(crate) mod support;
