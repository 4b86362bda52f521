//! Router device administration handlers.

mod add_device;
mod check_device;
mod delete_device;
mod test_connectivity;
mod update_device;

pub use add_device::{AddDeviceCommand, AddDeviceHandler};
pub use check_device::{CheckDeviceCommand, CheckDeviceHandler};
pub use delete_device::{DeleteDeviceCommand, DeleteDeviceHandler};
pub use test_connectivity::{
    ConnectivityReport, TestConnectivityCommand, TestConnectivityHandler,
};
pub use update_device::{UpdateDeviceCommand, UpdateDeviceHandler};
