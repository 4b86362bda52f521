//! Expiry sweeper configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Sweeper configuration.
///
/// The sweep cadence itself is owned by the external scheduler; this section
/// bounds how much work one pass takes on and when stuck vouchers stop being
/// retried automatically.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Maximum provisioning attempts before a pending voucher is flagged
    /// for manual intervention instead of retried
    #[serde(default = "default_max_provision_attempts")]
    pub max_provision_attempts: u32,

    /// Maximum vouchers processed per sweep pass
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Interval hint for schedulers that ask the sweeper, in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl SweeperConfig {
    /// Get the scheduler interval hint as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate sweeper configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_provision_attempts == 0 {
            return Err(ValidationError::InvalidRetryCeiling);
        }
        Ok(())
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            max_provision_attempts: default_max_provision_attempts(),
            batch_size: default_batch_size(),
            interval_secs: default_interval(),
        }
    }
}

fn default_max_provision_attempts() -> u32 {
    5
}

fn default_batch_size() -> u32 {
    200
}

fn default_interval() -> u64 {
    60
}
