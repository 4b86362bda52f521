//! RouterOS client and registry cache configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Connection parameters for the RouterOS API client.
///
/// Retry parameters are deliberately configuration rather than constants;
/// operational tuning differs per deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Timeout for a single connect/login/command round trip, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Number of connect attempts before giving up
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Delay between connect attempts, in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Registry cache TTLs per data class
    #[serde(default)]
    pub cache: CacheTtlConfig,
}

impl RouterConfig {
    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Get inter-attempt delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Validate router configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidRouterTimeout);
        }
        if self.connect_attempts == 0 {
            return Err(ValidationError::InvalidRouterAttempts);
        }
        self.cache.validate()
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            connect_attempts: default_connect_attempts(),
            retry_delay_secs: default_retry_delay(),
            cache: CacheTtlConfig::default(),
        }
    }
}

/// TTLs for the device registry's cached reads.
///
/// Volatile stats expire quickly; rarely-changing data (profiles, totals)
/// lives longer. All reads are also explicitly invalidated after any
/// mutating router operation, so these bound staleness only for pure reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheTtlConfig {
    /// Volatile stats (system resources, interface counters), in seconds
    #[serde(default = "default_volatile_ttl")]
    pub volatile_secs: u64,

    /// Connection and user lists, in seconds
    #[serde(default = "default_list_ttl")]
    pub list_secs: u64,

    /// Rarely-changing data (hotspot profiles, user counts), in seconds
    #[serde(default = "default_stable_ttl")]
    pub stable_secs: u64,
}

impl CacheTtlConfig {
    /// Validate cache TTL configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.volatile_secs == 0 || self.list_secs == 0 || self.stable_secs == 0 {
            return Err(ValidationError::InvalidCacheTtl);
        }
        Ok(())
    }

    /// TTL for volatile stats as Duration
    pub fn volatile(&self) -> Duration {
        Duration::from_secs(self.volatile_secs)
    }

    /// TTL for lists as Duration
    pub fn list(&self) -> Duration {
        Duration::from_secs(self.list_secs)
    }

    /// TTL for stable data as Duration
    pub fn stable(&self) -> Duration {
        Duration::from_secs(self.stable_secs)
    }
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            volatile_secs: default_volatile_ttl(),
            list_secs: default_list_ttl(),
            stable_secs: default_stable_ttl(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1
}

fn default_volatile_ttl() -> u64 {
    30
}

fn default_list_ttl() -> u64 {
    60
}

fn default_stable_ttl() -> u64 {
    300
}
