//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Router connect timeout must be nonzero")]
    InvalidRouterTimeout,

    #[error("Router connect attempts must be at least 1")]
    InvalidRouterAttempts,

    #[error("Cache TTL must be nonzero")]
    InvalidCacheTtl,

    #[error("Sweeper provision attempt ceiling must be at least 1")]
    InvalidRetryCeiling,

    #[error("Credential key must be 64 hex characters (32 bytes)")]
    InvalidCredentialKey,

    #[error("Invalid SMS gateway URL format")]
    InvalidSmsGatewayUrl,

    #[error("SMS sender id must be 1-11 characters")]
    InvalidSmsSenderId,
}
