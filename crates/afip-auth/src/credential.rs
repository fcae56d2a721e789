//! Service-specific credential assembly.
//!
//! Each AFIP service expects the ticket's token and sign under its own
//! field names. Key spelling is part of the wire contract:
//!
//! | service  | shape                                   |
//! |----------|-----------------------------------------|
//! | wsfe     | `{Token, Sign, Cuit}`                   |
//! | wsmtxca  | `{token, sign, cuitRepresentada}`       |
//! | wspn3    | `{token, sign}`                         |
//!
//! Two conditions produce [`Credential::Unset`] instead of an error: an
//! unrecognized service, and a ticket that is not well-formed XML. Whether
//! either should fail loudly is undecided, so both are tagged with an
//! [`UnsetReason`] and callers that need a usable credential call
//! [`Credential::ensure_usable`].

use quick_xml::escape::escape;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::context::ServiceContext;
use crate::error::{AuthError, AuthResult};
use crate::service::AfipService;
use crate::ticket::Ticket;

/// Why no credential could be shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsetReason {
    /// No credential shape is defined for this service.
    UnknownService(String),
    /// The stored ticket is not well-formed XML.
    UnparseableTicket,
}

impl fmt::Display for UnsetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownService(name) => write!(f, "no credential shape for service '{name}'"),
            Self::UnparseableTicket => f.write_str("stored ticket could not be parsed"),
        }
    }
}

/// Authentication payload attached to service calls.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// wsfe `Auth` element.
    Wsfe {
        token: String,
        sign: String,
        cuit: String,
    },
    /// wsmtxca `authRequest` element.
    Wsmtxca {
        token: String,
        sign: String,
        cuit_representada: String,
    },
    /// wspn3 token/sign pair.
    Wspn3 { token: String, sign: String },
    /// No credential was produced.
    Unset { reason: UnsetReason },
}

impl Credential {
    /// Shape a ticket's token and sign for `service`.
    #[must_use]
    pub fn for_service(service: &AfipService, ticket: &Ticket, cuit: &str) -> Self {
        let token = ticket.token.clone();
        let sign = ticket.sign.clone();
        match service {
            AfipService::Wsfe => Self::Wsfe {
                token,
                sign,
                cuit: cuit.to_string(),
            },
            AfipService::Wsmtxca => Self::Wsmtxca {
                token,
                sign,
                cuit_representada: cuit.to_string(),
            },
            AfipService::Wspn3 => Self::Wspn3 { token, sign },
            AfipService::Other(name) => Self::Unset {
                reason: UnsetReason::UnknownService(name.clone()),
            },
        }
    }

    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset { .. })
    }

    #[must_use]
    pub fn unset_reason(&self) -> Option<&UnsetReason> {
        match self {
            Self::Unset { reason } => Some(reason),
            _ => None,
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Wsfe { token, .. } | Self::Wsmtxca { token, .. } | Self::Wspn3 { token, .. } => {
                Some(token)
            }
            Self::Unset { .. } => None,
        }
    }

    #[must_use]
    pub fn sign(&self) -> Option<&str> {
        match self {
            Self::Wsfe { sign, .. } | Self::Wsmtxca { sign, .. } | Self::Wspn3 { sign, .. } => {
                Some(sign)
            }
            Self::Unset { .. } => None,
        }
    }

    /// Fail with `UnusableCredential` if the credential is unset.
    pub fn ensure_usable(&self, service: &AfipService) -> AuthResult<&Self> {
        match self {
            Self::Unset { reason } => Err(AuthError::UnusableCredential {
                service: service.to_string(),
                reason: reason.to_string(),
            }),
            _ => Ok(self),
        }
    }

    /// Wire field names and values, in document order.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Wsfe { token, sign, cuit } => vec![
                ("Token", token.as_str()),
                ("Sign", sign.as_str()),
                ("Cuit", cuit.as_str()),
            ],
            Self::Wsmtxca {
                token,
                sign,
                cuit_representada,
            } => vec![
                ("token", token.as_str()),
                ("sign", sign.as_str()),
                ("cuitRepresentada", cuit_representada.as_str()),
            ],
            Self::Wspn3 { token, sign } => {
                vec![("token", token.as_str()), ("sign", sign.as_str())]
            }
            Self::Unset { .. } => Vec::new(),
        }
    }

    /// Render as a SOAP body fragment.
    ///
    /// wsfe wraps the fields in `<Auth>`, wsmtxca in `<authRequest>`, and
    /// wspn3 emits bare `<token>`/`<sign>` elements. Unset renders empty.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let inner: String = self
            .fields()
            .into_iter()
            .map(|(name, value)| format!("<{name}>{}</{name}>", escape(value)))
            .collect();

        match self {
            Self::Wsfe { .. } => format!("<Auth>{inner}</Auth>"),
            Self::Wsmtxca { .. } => format!("<authRequest>{inner}</authRequest>"),
            Self::Wspn3 { .. } | Self::Unset { .. } => inner,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wsfe { cuit, .. } => f
                .debug_struct("Wsfe")
                .field("token", &"[REDACTED]")
                .field("sign", &"[REDACTED]")
                .field("cuit", cuit)
                .finish(),
            Self::Wsmtxca {
                cuit_representada, ..
            } => f
                .debug_struct("Wsmtxca")
                .field("token", &"[REDACTED]")
                .field("sign", &"[REDACTED]")
                .field("cuit_representada", cuit_representada)
                .finish(),
            Self::Wspn3 { .. } => f
                .debug_struct("Wspn3")
                .field("token", &"[REDACTED]")
                .field("sign", &"[REDACTED]")
                .finish(),
            Self::Unset { reason } => f.debug_struct("Unset").field("reason", reason).finish(),
        }
    }
}

/// Serializes to the wire mapping; `Unset` serializes as `null`.
impl Serialize for Credential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        if self.is_unset() {
            return serializer.serialize_none();
        }
        let fields = self.fields();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (name, value) in fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Read the stored ticket and shape the credential for the context's service.
///
/// The ticket must exist; a missing one fails with `MissingArtifact`. A
/// ticket that is not well-formed yields `Credential::Unset`.
pub async fn assemble(context: &ServiceContext<'_>) -> AuthResult<Credential> {
    let path = context.ticket_path();
    let raw = context.store.get(&path).await?;

    let ticket = match Ticket::parse(&raw) {
        Ok(ticket) => ticket,
        Err(e) => {
            tracing::warn!(
                service = %context.service,
                path = %path,
                error = %e,
                "Stored ticket is not parseable, returning unset credential"
            );
            return Ok(Credential::Unset {
                reason: UnsetReason::UnparseableTicket,
            });
        }
    };

    let credential = Credential::for_service(context.service, &ticket, &context.config.cuit);
    if let Some(reason) = credential.unset_reason() {
        tracing::warn!(service = %context.service, %reason, "Credential left unset");
    }
    Ok(credential)
}
