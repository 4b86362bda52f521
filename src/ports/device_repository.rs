//! Device repository port.
//!
//! Persistence for router devices. Implementations encrypt the credential
//! on write and decrypt on read; the encrypted value never appears on the
//! aggregate.

use async_trait::async_trait;

use crate::domain::device::RouterDevice;
use crate::domain::foundation::{DeviceId, DomainError};

/// Port for router device persistence.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Inserts a new device. Fails on duplicate name or IP address.
    async fn save(&self, device: &RouterDevice) -> Result<(), DomainError>;

    /// Persists an updated device.
    async fn update(&self, device: &RouterDevice) -> Result<(), DomainError>;

    /// Finds a device by id, credentials decrypted.
    async fn find_by_id(&self, id: &DeviceId) -> Result<Option<RouterDevice>, DomainError>;

    /// Finds a device by its unique name.
    async fn find_by_name(&self, name: &str) -> Result<Option<RouterDevice>, DomainError>;

    /// Lists all known devices.
    async fn list(&self) -> Result<Vec<RouterDevice>, DomainError>;

    /// Deletes a device. Callers must run the voucher dependency check
    /// first; the repository enforces nothing beyond existence.
    async fn delete(&self, id: &DeviceId) -> Result<(), DomainError>;
}
