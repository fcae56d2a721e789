//! Authentication pipeline.
//!
//! One attempt moves through
//! `Start -> Renewing -> ClientBuilt -> CredentialAssembled -> HealthChecked -> Done`.
//! Any step failure ends the attempt in `Failed` and is surfaced as a single
//! [`AuthFailure`]. Nothing is retried here.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::ServiceClientFactory;
use crate::config::AfipConfig;
use crate::context::ServiceContext;
use crate::credential::{self, Credential};
use crate::error::{AuthError, AuthFailure, AuthResult};
use crate::renewal::{ManualIssuer, StoredTicketRenewal, TicketIssuer, TicketRenewal};
use crate::service::AfipService;
use crate::soap::{SoapClient, SoapResponse};
use crate::status::{check_service_status_or_fail, DummyStatusCheck, ServiceStatusCheck};
use crate::store::{FileTicketStore, TicketStore};

/// Progress of one authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Start,
    Renewing,
    ClientBuilt,
    CredentialAssembled,
    HealthChecked,
    Done,
    Failed,
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Renewing => "renewing",
            Self::ClientBuilt => "client_built",
            Self::CredentialAssembled => "credential_assembled",
            Self::HealthChecked => "health_checked",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// A client bound to one service plus the credential to attach to its calls.
///
/// Owned by the caller once returned.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub service: AfipService,
    pub client: SoapClient,
    pub credential: Credential,
}

impl AuthenticatedSession {
    /// Call `operation` with the credential fragment prepended to `body`.
    pub async fn call(&self, operation: &str, body: &str) -> AuthResult<SoapResponse> {
        let credential = self.credential.ensure_usable(&self.service)?;
        let payload = format!("{}{body}", credential.to_xml());
        self.client.call(operation, &payload).await
    }
}

/// Runs the authentication pipeline against pluggable collaborators.
///
/// Defaults: tickets on the local filesystem, renewal through
/// [`ManualIssuer`], and the service's own `dummy` status operation as
/// the health check.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn TicketStore>,
    renewal: Arc<dyn TicketRenewal>,
    factory: ServiceClientFactory,
    status_check: Arc<dyn ServiceStatusCheck>,
}

impl Default for Authenticator {
    fn default() -> Self {
        Self {
            store: Arc::new(FileTicketStore::new()),
            renewal: Arc::new(StoredTicketRenewal::new(ManualIssuer)),
            factory: ServiceClientFactory::new(),
            status_check: Arc::new(DummyStatusCheck),
        }
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("store", &self.store.store_type())
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TicketStore>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_renewal(mut self, renewal: Arc<dyn TicketRenewal>) -> Self {
        self.renewal = renewal;
        self
    }

    /// Renew stale tickets through `issuer` with the default leeway.
    #[must_use]
    pub fn with_issuer<I: TicketIssuer + 'static>(self, issuer: I) -> Self {
        self.with_renewal(Arc::new(StoredTicketRenewal::new(issuer)))
    }

    #[must_use]
    pub fn with_client_factory(mut self, factory: ServiceClientFactory) -> Self {
        self.factory = factory;
        self
    }

    #[must_use]
    pub fn with_status_check(mut self, status_check: Arc<dyn ServiceStatusCheck>) -> Self {
        self.status_check = status_check;
        self
    }

    /// The ticket store in use.
    #[must_use]
    pub fn store(&self) -> &dyn TicketStore {
        self.store.as_ref()
    }

    /// Authenticate against `service_name` and return a ready session.
    pub async fn authenticate(
        &self,
        config: &AfipConfig,
        service_name: &str,
    ) -> Result<AuthenticatedSession, AuthFailure> {
        let service = AfipService::from_name(service_name);
        let context = ServiceContext::new(&service, self.store.as_ref(), config);

        let mut stage = AuthStage::Start;
        match self.run(&context, &mut stage).await {
            Ok((client, credential)) => {
                advance(&mut stage, AuthStage::Done, &service);
                info!(
                    service = %service,
                    endpoint = %client.endpoint(),
                    credential_unset = credential.is_unset(),
                    "Authenticated"
                );
                Ok(AuthenticatedSession {
                    service,
                    client,
                    credential,
                })
            }
            Err(e) => {
                warn!(
                    service = %service,
                    last_stage = %stage,
                    stage = %AuthStage::Failed,
                    error = %e,
                    "Authentication failed"
                );
                Err(AuthFailure::new(e))
            }
        }
    }

    async fn run(
        &self,
        context: &ServiceContext<'_>,
        stage: &mut AuthStage,
    ) -> AuthResult<(SoapClient, Credential)> {
        advance(stage, AuthStage::Renewing, context.service);
        self.renewal.ensure_fresh(context).await.map_err(|e| match e {
            AuthError::Renewal(_) | AuthError::MissingArtifact { .. } => e,
            other => AuthError::Renewal(other.to_string()),
        })?;

        let client = self.factory.build(context).await?;
        advance(stage, AuthStage::ClientBuilt, context.service);

        let credential = credential::assemble(context).await?;
        advance(stage, AuthStage::CredentialAssembled, context.service);

        check_service_status_or_fail(self.status_check.as_ref(), context.service, &client).await?;
        advance(stage, AuthStage::HealthChecked, context.service);

        Ok((client, credential))
    }
}

fn advance(stage: &mut AuthStage, next: AuthStage, service: &AfipService) {
    debug!(service = %service, from = %stage, to = %next, "Authentication stage");
    *stage = next;
}
