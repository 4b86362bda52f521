//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is loaded
//! with the `NETVEND_` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use netvend::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod router;
mod security;
mod sms;
mod sweeper;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use router::{CacheTtlConfig, RouterConfig};
pub use security::SecurityConfig;
pub use sms::SmsConfig;
pub use sweeper::SweeperConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the Netvend core.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// RouterOS client and registry cache configuration
    #[serde(default)]
    pub router: RouterConfig,

    /// Expiry sweeper configuration
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// SMS gateway configuration
    pub sms: SmsConfig,

    /// Credential encryption configuration
    pub security: SecurityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `NETVEND` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `NETVEND__DATABASE__URL=...` -> `database.url = ...`
    /// - `NETVEND__ROUTER__CONNECT_ATTEMPTS=5` -> `router.connect_attempts = 5`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("NETVEND")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.router.validate()?;
        self.sweeper.validate()?;
        self.sms.validate()?;
        self.security.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("NETVEND__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("NETVEND__SMS__GATEWAY_URL", "https://sms.example.com/send");
        env::set_var("NETVEND__SMS__API_KEY", "key-123");
        env::set_var("NETVEND__SECURITY__CREDENTIAL_KEY", &"ab".repeat(32));
    }

    fn clear_env() {
        env::remove_var("NETVEND__DATABASE__URL");
        env::remove_var("NETVEND__SMS__GATEWAY_URL");
        env::remove_var("NETVEND__SMS__API_KEY");
        env::remove_var("NETVEND__SECURITY__CREDENTIAL_KEY");
        env::remove_var("NETVEND__ROUTER__CONNECT_ATTEMPTS");
        env::remove_var("NETVEND__SWEEPER__MAX_PROVISION_ATTEMPTS");
    }

    #[test]
    fn load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn router_defaults_applied() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.router.connect_attempts, 3);
        assert_eq!(config.sweeper.max_provision_attempts, 5);
    }

    #[test]
    fn env_overrides_router_attempts() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("NETVEND__ROUTER__CONNECT_ATTEMPTS", "7");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.router.connect_attempts, 7);
    }
}
