//! CLI error types and exit codes

use afip_auth::{AuthError, AuthFailure};
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 2: Authentication failed
/// - 3: Missing ticket or WSDL
/// - 4: Validation error
/// - 5: Service unavailable
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Carries the full `Error de autenticación: ...` message.
    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    MissingArtifact(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unusable credential: {0}")]
    UnusableCredential(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Authentication(_) | CliError::UnusableCredential(_) => 2,
            CliError::MissingArtifact(_) => 3,
            CliError::Validation(_) => 4,
            CliError::ServiceUnavailable(_) => 5,
            CliError::Config(_) => 1,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {suggestion}");
            } else {
                eprintln!("\nSuggestion: {suggestion}");
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::MissingArtifact(_) => {
                Some("Check dir.xml_generados and dir.wsdl in your configuration.")
            }
            CliError::Config(_) => {
                Some("Pass --config <file> or set AFIP_CUIT and the other AFIP_* variables.")
            }
            CliError::Authentication(_) => {
                Some("Run 'afip ticket <service>' to see whether the stored ticket is still valid.")
            }
            _ => None,
        }
    }
}

impl From<AuthFailure> for CliError {
    fn from(failure: AuthFailure) -> Self {
        let message = failure.to_string();
        match failure.cause() {
            AuthError::MissingArtifact { .. } => CliError::MissingArtifact(message),
            AuthError::HealthCheck(_) => CliError::ServiceUnavailable(message),
            AuthError::Config(_) => CliError::Config(message),
            _ => CliError::Authentication(message),
        }
    }
}

impl From<AuthError> for CliError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Config(msg) => CliError::Config(msg),
            AuthError::UnusableCredential { .. } => CliError::UnusableCredential(e.to_string()),
            AuthError::MissingArtifact { .. } => CliError::MissingArtifact(e.to_string()),
            AuthError::HealthCheck(msg) => CliError::ServiceUnavailable(msg),
            other => CliError::Authentication(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Config(format!("JSON error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_missing_artifact() {
        let failure = AuthFailure::new(AuthError::MissingArtifact {
            path: "xml_generados/TA-20111111112-wsfe.xml".to_string(),
        });
        let error = CliError::from(failure);
        assert_eq!(error.exit_code(), 3);
        assert_eq!(
            error.to_string(),
            "Error de autenticación: Fallo al abrir: xml_generados/TA-20111111112-wsfe.xml"
        );
    }

    #[test]
    fn test_exit_code_health_check() {
        let failure = AuthFailure::new(AuthError::HealthCheck("wsfe is not available".to_string()));
        assert_eq!(CliError::from(failure).exit_code(), 5);
    }

    #[test]
    fn test_exit_code_renewal() {
        let failure = AuthFailure::new(AuthError::Renewal("expired".to_string()));
        let error = CliError::from(failure);
        assert_eq!(error.exit_code(), 2);
        assert!(error.to_string().starts_with("Error de autenticación: "));
    }

    #[test]
    fn test_exit_code_config() {
        let error = CliError::from(AuthError::Config("cuit must be 11 digits".to_string()));
        assert_eq!(error.exit_code(), 1);
        assert!(error.to_string().contains("cuit must be 11 digits"));
    }

    #[test]
    fn test_exit_code_validation() {
        assert_eq!(CliError::Validation("test".to_string()).exit_code(), 4);
    }
}
