//! Router client port for the RouterOS API.
//!
//! Defines the contract for speaking to a single MikroTik device. The
//! adapter owns connection management; callers see only typed queries,
//! commands, and a normalized error taxonomy. Raw transport errors never
//! cross this boundary.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::device::RouterDevice;

/// Port for RouterOS API access.
///
/// Implementations obtain a fresh authenticated session per operation (or
/// guard a pooled one internally); callers never hold connections.
#[async_trait]
pub trait RouterClient: Send + Sync {
    /// Issues a read query against an API path, e.g. `/ip/hotspot/user`.
    ///
    /// `filters` become `?key=value` query words (all must match);
    /// `fields`, when non-empty, restrict the returned proplist.
    /// Side-effect-free.
    async fn query(
        &self,
        device: &RouterDevice,
        path: &str,
        filters: &[(String, String)],
        fields: &[&str],
    ) -> Result<Vec<RouterRow>, RouterError>;

    /// Issues a write/action command, e.g. `/ip/hotspot/user/add`.
    ///
    /// Returns the provider-assigned identifier when the device reports one
    /// (the `=ret=` word of the reply).
    async fn execute(
        &self,
        device: &RouterDevice,
        path: &str,
        params: &[(String, String)],
    ) -> Result<CommandResult, RouterError>;
}

/// One tabular row of a RouterOS reply: attribute name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterRow(HashMap<String, String>);

impl RouterRow {
    pub fn new(attrs: HashMap<String, String>) -> Self {
        Self(attrs)
    }

    /// Looks up an attribute value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Looks up an attribute and parses it.
    pub fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// The RouterOS internal id (`.id`) of this row, if present.
    pub fn internal_id(&self) -> Option<&str> {
        self.get(".id")
    }

    /// Inserts an attribute (adapter and test use).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl FromIterator<(String, String)> for RouterRow {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Result of a write command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Provider-assigned identifier (`=ret=`), e.g. the new user's `*7` id.
    pub provider_id: Option<String>,
}

/// Normalized router errors.
///
/// Everything except `AuthFailed` is retryable: unreachable hosts and
/// timeouts are transient, protocol surprises may clear after a device
/// reboot, but bad credentials need a human.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// TCP connect failed or the host dropped us.
    #[error("router unreachable: {0}")]
    Unreachable(String),

    /// The device rejected our credentials.
    #[error("router authentication failed: {0}")]
    AuthFailed(String),

    /// An operation exceeded its deadline.
    #[error("router operation timed out: {0}")]
    Timeout(String),

    /// The device answered with something we could not interpret, or
    /// reported a trap for the command.
    #[error("router protocol error: {0}")]
    ProtocolError(String),
}

impl RouterError {
    /// Whether the sweeper should retry an operation that failed this way.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RouterError::AuthFailed(_))
    }
}

impl From<RouterError> for crate::domain::foundation::DomainError {
    fn from(err: RouterError) -> Self {
        use crate::domain::foundation::{DomainError, ErrorCode};
        let code = match err {
            RouterError::AuthFailed(_) => ErrorCode::RouterAuthFailed,
            _ => ErrorCode::RouterUnreachable,
        };
        DomainError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_client_is_object_safe() {
        fn _accepts_dyn(_client: &dyn RouterClient) {}
    }

    #[test]
    fn auth_failed_is_the_only_non_retryable_error() {
        assert!(RouterError::Unreachable("x".into()).is_retryable());
        assert!(RouterError::Timeout("x".into()).is_retryable());
        assert!(RouterError::ProtocolError("x".into()).is_retryable());
        assert!(!RouterError::AuthFailed("x".into()).is_retryable());
    }

    #[test]
    fn row_lookup_and_parse() {
        let row: RouterRow = [
            (".id".to_string(), "*7".to_string()),
            ("uptime".to_string(), "3600".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(row.internal_id(), Some("*7"));
        assert_eq!(row.get_parsed::<u64>("uptime"), Some(3600));
        assert_eq!(row.get("missing"), None);
    }
}
