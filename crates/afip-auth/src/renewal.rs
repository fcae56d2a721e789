//! Ticket freshness and renewal.
//!
//! [`TicketRenewal`] is the seam the authenticator calls before reading a
//! ticket. The default [`StoredTicketRenewal`] only contacts the identity
//! provider (through a [`TicketIssuer`]) when the stored ticket is missing,
//! unparseable or about to expire, so repeated calls with a fresh ticket
//! are no-ops.

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::{debug, info, warn};

use crate::context::ServiceContext;
use crate::error::{AuthError, AuthResult};
use crate::ticket::Ticket;

/// Default margin before expiration at which a ticket is renewed.
pub const DEFAULT_RENEWAL_LEEWAY_SECS: i64 = 60;

/// Makes sure a non-expired ticket is stored for the context's service.
#[async_trait]
pub trait TicketRenewal: Send + Sync {
    async fn ensure_fresh(&self, context: &ServiceContext<'_>) -> AuthResult<()>;
}

/// Obtains a new ticket from the identity provider (WSAA `loginCms`).
///
/// Implementations sign the login request and return the raw
/// `loginTicketResponse` document.
#[async_trait]
pub trait TicketIssuer: Send + Sync {
    async fn issue(&self, context: &ServiceContext<'_>) -> AuthResult<Vec<u8>>;
}

/// Issuer for deployments where tickets are provisioned out of band.
///
/// Always fails, naming the path where a fresh ticket is expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualIssuer;

#[async_trait]
impl TicketIssuer for ManualIssuer {
    async fn issue(&self, context: &ServiceContext<'_>) -> AuthResult<Vec<u8>> {
        Err(AuthError::Renewal(format!(
            "no ticket issuer configured for '{}'; provision a fresh ticket at {}",
            context.service,
            context.ticket_path()
        )))
    }
}

/// Freshness of the stored ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketState {
    /// Usable until `expires_at` (minus leeway).
    Fresh { expires_at: DateTime<FixedOffset> },
    /// Expired, or expiring within the leeway. `expires_at` is `None` when
    /// the ticket carries no readable expiration.
    Stale {
        expires_at: Option<DateTime<FixedOffset>>,
    },
    /// Nothing stored at the ticket path.
    Missing,
    /// Stored content is not a well-formed ticket.
    Unreadable,
}

impl TicketState {
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }
}

/// Renews through a [`TicketIssuer`] only when the stored ticket is not fresh.
#[derive(Debug, Clone)]
pub struct StoredTicketRenewal<I> {
    issuer: I,
    leeway: Duration,
}

impl<I: TicketIssuer> StoredTicketRenewal<I> {
    #[must_use]
    pub fn new(issuer: I) -> Self {
        Self {
            issuer,
            leeway: Duration::seconds(DEFAULT_RENEWAL_LEEWAY_SECS),
        }
    }

    /// Renew tickets that expire within `leeway`.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    #[must_use]
    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// Classify the stored ticket at `now`.
    pub async fn inspect_at(
        &self,
        context: &ServiceContext<'_>,
        now: DateTime<Utc>,
    ) -> AuthResult<TicketState> {
        let path = context.ticket_path();
        if !context.store.exists(&path).await? {
            return Ok(TicketState::Missing);
        }

        let raw = context.store.get(&path).await?;
        let Ok(ticket) = Ticket::parse(&raw) else {
            return Ok(TicketState::Unreadable);
        };

        Ok(match ticket.expiration_time {
            Some(expires_at) if !ticket.is_expired_at(now, self.leeway) => {
                TicketState::Fresh { expires_at }
            }
            expires_at => TicketState::Stale { expires_at },
        })
    }

    pub async fn inspect(&self, context: &ServiceContext<'_>) -> AuthResult<TicketState> {
        self.inspect_at(context, Utc::now()).await
    }
}

#[async_trait]
impl<I: TicketIssuer> TicketRenewal for StoredTicketRenewal<I> {
    async fn ensure_fresh(&self, context: &ServiceContext<'_>) -> AuthResult<()> {
        let path = context.ticket_path();
        let state = self.inspect(context).await?;

        if let TicketState::Fresh { expires_at } = state {
            debug!(service = %context.service, %expires_at, "Stored ticket is fresh");
            return Ok(());
        }

        info!(service = %context.service, path = %path, ?state, "Renewing access ticket");

        let raw = self.issuer.issue(context).await.map_err(|e| match e {
            AuthError::Renewal(_) => e,
            other => AuthError::Renewal(other.to_string()),
        })?;

        let ticket = Ticket::parse(&raw)
            .map_err(|e| AuthError::Renewal(format!("issuer returned an invalid ticket: {e}")))?;
        if ticket.is_expired_at(Utc::now(), Duration::zero()) {
            warn!(service = %context.service, "Issuer returned an already expired ticket");
            return Err(AuthError::Renewal(
                "issuer returned an expired ticket".to_string(),
            ));
        }

        context.store.put(&path, &raw).await?;
        info!(
            service = %context.service,
            expires_at = ?ticket.expiration_time,
            "Access ticket renewed"
        );
        Ok(())
    }
}
