//! TestConnectivityHandler - probe a device configuration before saving.
//!
//! Runs against an ephemeral device built from the submitted config;
//! nothing is persisted either way, so an operator can iterate on
//! credentials until the probe passes and only then register.

use std::sync::Arc;

use crate::domain::device::{DeviceConfig, RouterDevice};
use crate::domain::foundation::DomainError;
use crate::ports::{RouterClient, RouterError};

/// Command carrying the candidate configuration.
#[derive(Debug, Clone)]
pub struct TestConnectivityCommand {
    pub config: DeviceConfig,
}

/// Probe outcome.
#[derive(Debug, Clone)]
pub struct ConnectivityReport {
    pub reachable: bool,
    /// RouterOS version string, when the probe succeeded.
    pub version: Option<String>,
    /// Device uptime notation (for example `1w2d3h`), when reported.
    pub uptime: Option<String>,
    /// Failure detail, when the probe did not succeed.
    pub error: Option<String>,
}

/// Handler for pre-registration connectivity tests.
pub struct TestConnectivityHandler {
    router: Arc<dyn RouterClient>,
}

impl TestConnectivityHandler {
    pub fn new(router: Arc<dyn RouterClient>) -> Self {
        Self { router }
    }

    pub async fn handle(
        &self,
        cmd: TestConnectivityCommand,
    ) -> Result<ConnectivityReport, DomainError> {
        let config = cmd.config.validate()?;
        let device = RouterDevice::from_config(config);

        match self
            .router
            .query(&device, "/system/resource", &[], &[])
            .await
        {
            Ok(rows) => {
                let resource = rows.first();
                Ok(ConnectivityReport {
                    reachable: true,
                    version: resource
                        .and_then(|row| row.get("version"))
                        .map(str::to_string),
                    uptime: resource
                        .and_then(|row| row.get("uptime"))
                        .map(str::to_string),
                    error: None,
                })
            }
            Err(err @ RouterError::AuthFailed(_)) => Ok(ConnectivityReport {
                reachable: true,
                version: None,
                uptime: None,
                error: Some(err.to_string()),
            }),
            Err(err) => Ok(ConnectivityReport {
                reachable: false,
                version: None,
                uptime: None,
                error: Some(err.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::support::{StubRouter, World};
    use crate::ports::RouterRow;
    use secrecy::SecretString;

    fn config() -> DeviceConfig {
        DeviceConfig::new(
            "candidate",
            "10.0.0.9",
            8728,
            "api",
            SecretString::new("pw".to_string()),
        )
    }

    fn resource_row() -> RouterRow {
        [
            ("version".to_string(), "7.14.2".to_string()),
            ("uptime".to_string(), "1w2d3h".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn reports_version_and_uptime_on_success() {
        let world = World::new();
        world.router.set_rows("/system/resource", vec![resource_row()]);
        let handler = TestConnectivityHandler::new(world.router.clone());

        let report = handler
            .handle(TestConnectivityCommand { config: config() })
            .await
            .unwrap();

        assert!(report.reachable);
        assert_eq!(report.version.as_deref(), Some("7.14.2"));
        assert_eq!(report.uptime.as_deref(), Some("1w2d3h"));
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn auth_failure_is_reachable_but_errored() {
        let router = Arc::new(StubRouter::default());
        router.fail_with(RouterError::AuthFailed("bad credentials".to_string()));
        let handler = TestConnectivityHandler::new(router);

        let report = handler
            .handle(TestConnectivityCommand { config: config() })
            .await
            .unwrap();

        assert!(report.reachable);
        assert!(report.error.as_deref().unwrap_or("").contains("bad credentials"));
    }

    #[tokio::test]
    async fn unreachable_device_is_reported_not_raised() {
        let router = Arc::new(StubRouter::default());
        router.fail_with(RouterError::Unreachable("connection refused".to_string()));
        let handler = TestConnectivityHandler::new(router);

        let report = handler
            .handle(TestConnectivityCommand { config: config() })
            .await
            .unwrap();

        assert!(!report.reachable);
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_any_probe() {
        let router = Arc::new(StubRouter::default());
        let handler = TestConnectivityHandler::new(router);
        let mut config = config();
        config.ip_address = "999.9.9.9".to_string();

        assert!(handler
            .handle(TestConnectivityCommand { config })
            .await
            .is_err());
    }
}
