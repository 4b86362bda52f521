//! Device registry: cached router reads and health tracking.

mod device_registry;

pub use device_registry::DeviceRegistry;
