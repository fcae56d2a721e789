//! Protocol client construction.

use std::time::Duration;

use crate::context::ServiceContext;
use crate::error::{AuthError, AuthResult};
use crate::soap::SoapClient;

/// Builds a [`SoapClient`] bound to the context's service endpoint.
///
/// Both the stored ticket and the bundled WSDL must exist before a client
/// is built. The ticket is looked up in the pluggable store; the WSDL is
/// always read from the local filesystem.
#[derive(Debug, Clone)]
pub struct ServiceClientFactory {
    trace: bool,
    http_client: Option<reqwest::Client>,
}

impl Default for ServiceClientFactory {
    fn default() -> Self {
        Self {
            trace: true,
            http_client: None,
        }
    }
}

impl ServiceClientFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable request/response tracing on built clients.
    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Use a pre-built `reqwest::Client` instead of one per service.
    #[must_use]
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub async fn build(&self, context: &ServiceContext<'_>) -> AuthResult<SoapClient> {
        let ticket_path = context.ticket_path();
        if !context.store.exists(&ticket_path).await? {
            return Err(AuthError::MissingArtifact { path: ticket_path });
        }

        let wsdl_path = context.config.wsdl_path(context.service);
        let wsdl_exists = tokio::fs::try_exists(&wsdl_path).await.unwrap_or(false);
        if !wsdl_exists {
            return Err(AuthError::MissingArtifact {
                path: wsdl_path.display().to_string(),
            });
        }

        let endpoint = context.config.url_for(context.service)?;

        tracing::debug!(
            service = %context.service,
            endpoint = %endpoint,
            wsdl = %wsdl_path.display(),
            "Building SOAP client"
        );

        match &self.http_client {
            Some(http_client) => {
                SoapClient::with_http_client(&wsdl_path, endpoint, http_client.clone(), self.trace)
                    .await
            }
            None => {
                SoapClient::connect(
                    &wsdl_path,
                    endpoint,
                    Duration::from_secs(context.config.request_timeout_secs),
                    self.trace,
                )
                .await
            }
        }
    }
}
