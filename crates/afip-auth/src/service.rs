//! Known AFIP web services.

use std::fmt;
use std::path::PathBuf;

/// An AFIP web service, identified by its exact name.
///
/// The three named variants have a dedicated credential shape. Any other
/// name, including a differently cased known one, is carried verbatim as
/// `Other` and authenticates with an unset credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AfipService {
    /// Factura electrónica v1.
    Wsfe,
    /// Factura electrónica con detalle de ítems.
    Wsmtxca,
    /// Padrón de contribuyentes, nivel 3.
    Wspn3,
    /// Any service without a dedicated credential shape.
    Other(String),
}

impl AfipService {
    /// Parse from a service name. Matching is exact: `"WSFE"` is not wsfe.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "wsfe" => Self::Wsfe,
            "wsmtxca" => Self::Wsmtxca,
            "wspn3" => Self::Wspn3,
            other => Self::Other(other.to_string()),
        }
    }

    /// Service name as used in ticket file names and URL maps.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Wsfe => "wsfe",
            Self::Wsmtxca => "wsmtxca",
            Self::Wspn3 => "wspn3",
            Self::Other(name) => name,
        }
    }

    /// Whether a dedicated credential shape exists for this service.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Protocol-definition path relative to the WSDL base directory:
    /// `<SERVICE_UPPER>/<service>.wsdl`.
    #[must_use]
    pub fn wsdl_relative_path(&self) -> PathBuf {
        let name = self.name();
        PathBuf::from(name.to_uppercase()).join(format!("{name}.wsdl"))
    }

    /// Name of the no-op status operation exposed by the service.
    #[must_use]
    pub fn status_operation(&self) -> &'static str {
        match self {
            Self::Wsfe => "FEDummy",
            _ => "dummy",
        }
    }
}

impl fmt::Display for AfipService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for AfipService {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}
