//! Service status check.
//!
//! Every AFIP service exposes a no-op `dummy` operation (`FEDummy` on
//! wsfe) reporting the state of its application, database and
//! authentication servers. A service is healthy only when all three
//! report `OK`.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AuthError, AuthResult};
use crate::service::AfipService;
use crate::soap::SoapClient;

/// Server components reported by the status operation.
pub const STATUS_COMPONENTS: [&str; 3] = ["AppServer", "DbServer", "AuthServer"];

/// Component states reported by a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub app_server: Option<String>,
    pub db_server: Option<String>,
    pub auth_server: Option<String>,
}

impl ServiceStatus {
    /// Whether every component reports `OK`.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        [&self.app_server, &self.db_server, &self.auth_server]
            .iter()
            .all(|s| s.as_deref().is_some_and(|v| v.trim().eq_ignore_ascii_case("OK")))
    }

    /// `AppServer=OK, DbServer=DOWN, AuthServer=?`
    #[must_use]
    pub fn summary(&self) -> String {
        STATUS_COMPONENTS
            .iter()
            .zip([&self.app_server, &self.db_server, &self.auth_server])
            .map(|(name, value)| format!("{name}={}", value.as_deref().unwrap_or("?")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Verifies that a service is reachable and healthy before a session is
/// handed out.
#[async_trait]
pub trait ServiceStatusCheck: Send + Sync {
    /// Returns `AuthError::HealthCheck` if the service is not healthy.
    async fn check(&self, service: &AfipService, client: &SoapClient) -> AuthResult<()>;
}

/// Check that calls the service's status operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyStatusCheck;

impl DummyStatusCheck {
    /// Call the status operation and read the component states.
    pub async fn status(
        &self,
        service: &AfipService,
        client: &SoapClient,
    ) -> AuthResult<ServiceStatus> {
        let operation = service.status_operation();
        let response = client
            .call(operation, "")
            .await
            .map_err(|e| AuthError::HealthCheck(format!("{service} unreachable: {e}")))?;

        if let Some(fault) = &response.fault {
            return Err(AuthError::HealthCheck(format!(
                "{service} {operation} returned fault {fault}"
            )));
        }

        let read = |name: &str| response.find_text_ignore_case(name).map(str::to_string);
        Ok(ServiceStatus {
            app_server: read("AppServer"),
            db_server: read("DbServer"),
            auth_server: read("AuthServer"),
        })
    }
}

#[async_trait]
impl ServiceStatusCheck for DummyStatusCheck {
    async fn check(&self, service: &AfipService, client: &SoapClient) -> AuthResult<()> {
        let status = self.status(service, client).await?;
        if status.is_healthy() {
            tracing::debug!(service = %service, "Service status OK");
            Ok(())
        } else {
            Err(AuthError::HealthCheck(format!(
                "{service} is not available ({})",
                status.summary()
            )))
        }
    }
}

/// Run `check` against `client`, failing if the service is unhealthy.
pub async fn check_service_status_or_fail(
    check: &dyn ServiceStatusCheck,
    service: &AfipService,
    client: &SoapClient,
) -> AuthResult<()> {
    check.check(service, client).await.map_err(|e| match e {
        AuthError::HealthCheck(_) => e,
        other => AuthError::HealthCheck(other.to_string()),
    })
}
