//! Error types for AFIP authentication.
//!
//! `AuthError` is the internal taxonomy raised by each pipeline step.
//! `AuthFailure` is the single shape surfaced by [`crate::Authenticator`].

use thiserror::Error;

/// Localized prefix carried by every [`AuthFailure`] message.
pub const AUTH_FAILURE_PREFIX: &str = "Error de autenticación: ";

/// Result alias for pipeline steps.
pub type AuthResult<T> = Result<T, AuthError>;

/// Failures raised by individual authentication steps.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// A ticket or protocol-definition file is absent.
    #[error("Fallo al abrir: {path}")]
    MissingArtifact { path: String },

    /// Ticket renewal against the identity provider failed.
    #[error("Ticket renewal failed: {0}")]
    Renewal(String),

    /// The target service reported itself unhealthy or could not be reached.
    #[error("Service status check failed: {0}")]
    HealthCheck(String),

    /// Reading or writing the ticket store failed.
    #[error("Ticket storage error: {0}")]
    Storage(String),

    /// HTTP transport failure (connection, timeout, TLS).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration is missing a required value or holds an invalid one.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A credential was requested to be usable but is unset.
    #[error("Credential for '{service}' is unset: {reason}")]
    UnusableCredential { service: String, reason: String },
}

impl AuthError {
    /// Check if this error names an absent artifact.
    #[must_use]
    pub fn is_missing_artifact(&self) -> bool {
        matches!(self, AuthError::MissingArtifact { .. })
    }

    /// Check if this error came from ticket renewal.
    #[must_use]
    pub fn is_renewal(&self) -> bool {
        matches!(self, AuthError::Renewal(_))
    }

    /// Check if this error came from the service status check.
    #[must_use]
    pub fn is_health_check(&self) -> bool {
        matches!(self, AuthError::HealthCheck(_))
    }

    /// Path of the missing artifact, if any.
    #[must_use]
    pub fn missing_path(&self) -> Option<&str> {
        match self {
            AuthError::MissingArtifact { path } => Some(path),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Transport(e.to_string())
    }
}

/// The only error returned by [`crate::Authenticator::authenticate`].
///
/// Every step failure is re-wrapped here behind [`AUTH_FAILURE_PREFIX`].
/// The originating [`AuthError`] stays reachable through `source()`.
#[derive(Debug, Clone, Error)]
#[error("{}{}", AUTH_FAILURE_PREFIX, .cause)]
pub struct AuthFailure {
    #[source]
    cause: AuthError,
}

impl AuthFailure {
    #[must_use]
    pub fn new(cause: AuthError) -> Self {
        Self { cause }
    }

    /// The step error that aborted authentication.
    #[must_use]
    pub fn cause(&self) -> &AuthError {
        &self.cause
    }

    #[must_use]
    pub fn into_cause(self) -> AuthError {
        self.cause
    }
}

impl From<AuthError> for AuthFailure {
    fn from(cause: AuthError) -> Self {
        Self::new(cause)
    }
}
