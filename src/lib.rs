//! Netvend - Voucher Lifecycle & Router Provisioning Core
//!
//! This crate implements the billing core of a hotspot ISP platform:
//! time/data-limited access vouchers are activated by provisioning hotspot
//! users onto MikroTik RouterOS devices, expired by a periodic sweeper, and
//! delivered to customers over SMS exactly once per state transition.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
