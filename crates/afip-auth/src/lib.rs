//! Authentication helper for AFIP web services.
//!
//! This crate provides:
//! - Access ticket (TA) freshness checks and renewal through a pluggable issuer
//! - Ticket storage behind the [`TicketStore`] trait (filesystem by default)
//! - Per-service credential shaping (`wsfe`, `wsmtxca`, `wspn3`)
//! - A SOAP 1.2 client bound to the service endpoint, with faults as values
//! - A status check run before a session is handed out
//!
//! # Example
//!
//! ```rust,ignore
//! use afip_auth::{AfipConfig, Authenticator};
//!
//! let config = AfipConfig::from_env()?;
//! let session = Authenticator::new()
//!     .with_issuer(my_wsaa_issuer)
//!     .authenticate(&config, "wsfe")
//!     .await?;
//!
//! let response = session.call("FECompUltimoAutorizado", "<PtoVta>1</PtoVta><CbteTipo>11</CbteTipo>").await?;
//! ```

pub mod authenticator;
pub mod client;
pub mod config;
pub mod context;
pub mod credential;
pub mod error;
pub mod renewal;
pub mod service;
pub mod soap;
pub mod status;
pub mod store;
pub mod ticket;

// Re-export public API
pub use authenticator::{AuthStage, AuthenticatedSession, Authenticator};
pub use client::ServiceClientFactory;
pub use config::{AfipConfig, Directories};
pub use context::ServiceContext;
pub use credential::{Credential, UnsetReason};
pub use error::{AuthError, AuthFailure, AuthResult, AUTH_FAILURE_PREFIX};
pub use renewal::{ManualIssuer, StoredTicketRenewal, TicketIssuer, TicketRenewal, TicketState};
pub use service::AfipService;
pub use soap::{SoapClient, SoapExchange, SoapFault, SoapResponse};
pub use status::{check_service_status_or_fail, DummyStatusCheck, ServiceStatus, ServiceStatusCheck};
pub use store::{FileTicketStore, MemoryTicketStore, TicketStore};
pub use ticket::{Ticket, TicketParseError};

/// Authenticate with the default collaborators.
///
/// Tickets are read from the local filesystem and are not renewed
/// automatically; use [`Authenticator::with_issuer`] for that.
pub async fn authenticate(
    config: &AfipConfig,
    service_name: &str,
) -> Result<AuthenticatedSession, AuthFailure> {
    Authenticator::default()
        .authenticate(config, service_name)
        .await
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, FixedOffset, SecondsFormat};

    /// A `loginTicketResponse` document expiring at `expiration`.
    pub fn ticket_xml(token: &str, sign: &str, expiration: impl Into<DateTime<FixedOffset>>) -> String {
        let expiration = expiration.into();
        let generation = expiration - Duration::hours(12);
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<loginTicketResponse version="1.0">
    <header>
        <source>CN=wsaahomo, O=AFIP, C=AR, SERIALNUMBER=CUIT 33693450239</source>
        <destination>SERIALNUMBER=CUIT 20111111112, CN=test</destination>
        <uniqueId>1</uniqueId>
        <generationTime>{}</generationTime>
        <expirationTime>{}</expirationTime>
    </header>
    <credentials>
        <token>{token}</token>
        <sign>{sign}</sign>
    </credentials>
</loginTicketResponse>"#,
            generation.to_rfc3339_opts(SecondsFormat::Millis, false),
            expiration.to_rfc3339_opts(SecondsFormat::Millis, false),
        )
    }
}
