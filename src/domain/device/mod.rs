//! Router device domain: aggregate, validated configuration, credentials.

mod config;
mod device;

pub use config::{DeviceConfig, DevicePatch, ValidatedDeviceConfig};
pub use device::{DevicePassword, DeviceStatus, RouterDevice};
