//! AFIP session configuration.
//!
//! Built in code, parsed from a JSON document shaped like
//! `{"cuit": .., "sandbox": .., "dir": {"xml_generados": ..}, "url": {..}}`,
//! or read from `AFIP_*` environment variables.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{AuthError, AuthResult};
use crate::service::AfipService;

/// Default transport timeout for SOAP calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Homologation (sandbox) endpoints.
const SANDBOX_URLS: &[(&str, &str)] = &[
    ("wsaa", "https://wsaahomo.afip.gov.ar/ws/services/LoginCms"),
    ("wsfe", "https://wswhomo.afip.gov.ar/wsfev1/service.asmx"),
    (
        "wsmtxca",
        "https://fwshomo.afip.gov.ar/wsmtxca/services/MTXCAService",
    ),
    (
        "wspn3",
        "https://awshomo.afip.gov.ar/padron-puc-ws/services/select.ContribuyenteNivel3SelectServiceImpl",
    ),
];

/// Production endpoints.
const PRODUCTION_URLS: &[(&str, &str)] = &[
    ("wsaa", "https://wsaa.afip.gov.ar/ws/services/LoginCms"),
    ("wsfe", "https://servicios1.afip.gov.ar/wsfev1/service.asmx"),
    (
        "wsmtxca",
        "https://serviciosjava.afip.gob.ar/wsmtxca/services/MTXCAService",
    ),
    (
        "wspn3",
        "https://aws.afip.gov.ar/padron-puc-ws/services/select.ContribuyenteNivel3SelectServiceImpl",
    ),
];

/// Directory layout for runtime tickets and bundled protocol definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directories {
    /// Prefix under which tickets are stored. Ticket paths are formed by
    /// appending `TA-<cuit>-<service>.xml`.
    #[serde(default = "default_ticket_dir")]
    pub xml_generados: String,

    /// Base directory holding `<SERVICE_UPPER>/<service>.wsdl` files.
    #[serde(default = "default_wsdl_dir")]
    pub wsdl: PathBuf,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            xml_generados: default_ticket_dir(),
            wsdl: default_wsdl_dir(),
        }
    }
}

fn default_ticket_dir() -> String {
    "xml_generados/".to_string()
}

fn default_wsdl_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/wsdl"))
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Immutable configuration for one authentication session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfipConfig {
    /// Taxpayer id (CUIT), 11 digits.
    #[serde(deserialize_with = "string_or_number")]
    pub cuit: String,

    /// Use homologation endpoints instead of production.
    #[serde(default)]
    pub sandbox: bool,

    #[serde(default)]
    pub dir: Directories,

    /// Service name to endpoint URL. Missing known services are filled
    /// from the built-in endpoint table.
    #[serde(default)]
    pub url: HashMap<String, String>,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl AfipConfig {
    /// Create a configuration with default directories and built-in URLs.
    #[must_use]
    pub fn new(cuit: impl Into<String>, sandbox: bool) -> Self {
        Self {
            cuit: cuit.into(),
            sandbox,
            dir: Directories::default(),
            url: HashMap::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
        .with_default_urls()
    }

    #[must_use]
    pub fn with_ticket_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir.xml_generados = dir.into();
        self
    }

    #[must_use]
    pub fn with_wsdl_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir.wsdl = dir.into();
        self
    }

    /// Set or override the endpoint of one service. The key is the exact
    /// service name.
    #[must_use]
    pub fn with_url(mut self, service: &str, url: impl Into<String>) -> Self {
        self.url.insert(service.to_string(), url.into());
        self
    }

    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Fill endpoints for known services that have none configured.
    #[must_use]
    pub fn with_default_urls(mut self) -> Self {
        let table = if self.sandbox {
            SANDBOX_URLS
        } else {
            PRODUCTION_URLS
        };
        for (service, url) in table {
            self.url
                .entry((*service).to_string())
                .or_insert_with(|| (*url).to_string());
        }
        self
    }

    /// Whether production endpoints are in use (the inverse of `sandbox`).
    #[must_use]
    pub fn production(&self) -> bool {
        !self.sandbox
    }

    /// Endpoint URL for a service.
    pub fn url_for(&self, service: &AfipService) -> AuthResult<&str> {
        self.url
            .get(service.name())
            .map(String::as_str)
            .ok_or_else(|| {
                AuthError::Config(format!("No endpoint URL configured for '{service}'"))
            })
    }

    /// Conventional ticket path: `<xml_generados>TA-<cuit>-<service>.xml`.
    #[must_use]
    pub fn ticket_path(&self, service: &AfipService) -> String {
        format!(
            "{}TA-{}-{}.xml",
            self.dir.xml_generados, self.cuit, service
        )
    }

    /// Local protocol-definition path: `<wsdl>/<SERVICE_UPPER>/<service>.wsdl`.
    #[must_use]
    pub fn wsdl_path(&self, service: &AfipService) -> PathBuf {
        self.dir.wsdl.join(service.wsdl_relative_path())
    }

    /// Check that the CUIT and every configured URL are well formed.
    pub fn validate(&self) -> AuthResult<()> {
        if self.cuit.len() != 11 || !self.cuit.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::Config(format!(
                "CUIT must be 11 digits, got '{}'",
                self.cuit
            )));
        }

        for (service, raw) in &self.url {
            let parsed = url::Url::parse(raw).map_err(|e| {
                AuthError::Config(format!("Invalid URL for '{service}': {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AuthError::Config(format!(
                    "Unsupported scheme for '{service}': {}",
                    parsed.scheme()
                )));
            }
        }

        Ok(())
    }

    /// Parse a JSON configuration document and fill default URLs.
    pub fn from_json_str(json: &str) -> AuthResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AuthError::Config(format!("Invalid configuration JSON: {e}")))?;
        let config = config.with_default_urls();
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: &Path) -> AuthResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AuthError::Config(format!("Cannot read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse configuration from environment variables.
    ///
    /// Reads:
    /// - `AFIP_CUIT` (required)
    /// - `AFIP_SANDBOX` (default: true)
    /// - `AFIP_TICKET_DIR`, `AFIP_WSDL_DIR`
    /// - `AFIP_URL_{SERVICE}` per-service endpoint overrides, keyed by the
    ///   lowercased suffix (`AFIP_URL_WSFE` sets `wsfe`)
    /// - `AFIP_REQUEST_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> AuthResult<Self> {
        Self::from_vars(env::vars())
    }

    /// Same as [`Self::from_env`] over an explicit variable set.
    pub fn from_vars<I>(vars: I) -> AuthResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let cuit = vars
            .get("AFIP_CUIT")
            .filter(|s| !s.is_empty())
            .cloned()
            .ok_or_else(|| AuthError::Config("AFIP_CUIT is required".to_string()))?;

        let sandbox = vars
            .get("AFIP_SANDBOX")
            .map_or(true, |s| !matches!(s.to_lowercase().as_str(), "false" | "0" | "no"));

        let mut config = Self {
            cuit,
            sandbox,
            dir: Directories::default(),
            url: HashMap::new(),
            request_timeout_secs: vars
                .get("AFIP_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        if let Some(dir) = vars.get("AFIP_TICKET_DIR").filter(|s| !s.is_empty()) {
            config.dir.xml_generados.clone_from(dir);
        }
        if let Some(dir) = vars.get("AFIP_WSDL_DIR").filter(|s| !s.is_empty()) {
            config.dir.wsdl = PathBuf::from(dir);
        }

        for (key, value) in &vars {
            if let Some(service) = key.strip_prefix("AFIP_URL_") {
                config.url.insert(service.to_lowercase(), value.clone());
            }
        }

        let config = config.with_default_urls();
        config.validate()?;
        Ok(config)
    }
}

/// Accept the CUIT as either a JSON string or a JSON number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_production_is_inverse_of_sandbox() {
        assert!(!AfipConfig::new("20111111112", true).production());
        assert!(AfipConfig::new("20111111112", false).production());
    }

    #[test]
    fn test_default_urls_follow_environment() {
        let sandbox = AfipConfig::new("20111111112", true);
        assert_eq!(
            sandbox.url_for(&AfipService::Wsfe).unwrap(),
            "https://wswhomo.afip.gov.ar/wsfev1/service.asmx"
        );

        let production = AfipConfig::new("20111111112", false);
        assert_eq!(
            production.url_for(&AfipService::Wsfe).unwrap(),
            "https://servicios1.afip.gov.ar/wsfev1/service.asmx"
        );
    }

    #[test]
    fn test_explicit_url_wins_over_default() {
        let config = AfipConfig::new("20111111112", true)
            .with_url("wsfe", "http://localhost:8080/wsfe")
            .with_default_urls();
        assert_eq!(
            config.url_for(&AfipService::Wsfe).unwrap(),
            "http://localhost:8080/wsfe"
        );
    }

    #[test]
    fn test_service_names_are_not_normalized() {
        let config = AfipConfig::new("20111111112", true)
            .with_ticket_dir("/ta/")
            .with_wsdl_dir("/opt/afip/wsdl")
            .with_url("WSCT", "http://localhost:9000/wsct");

        let upper = AfipService::from_name("WSFE");
        assert_eq!(config.ticket_path(&upper), "/ta/TA-20111111112-WSFE.xml");
        assert_eq!(
            config.wsdl_path(&upper),
            PathBuf::from("/opt/afip/wsdl/WSFE/WSFE.wsdl")
        );
        assert!(config.url_for(&upper).is_err());

        let wsct = AfipService::from_name("WSCT");
        assert_eq!(config.ticket_path(&wsct), "/ta/TA-20111111112-WSCT.xml");
        assert_eq!(config.url_for(&wsct).unwrap(), "http://localhost:9000/wsct");
        assert!(config.url_for(&AfipService::from_name("wsct")).is_err());
    }

    #[test]
    fn test_json_url_keys_are_exact() {
        let json = r#"{
            "cuit": "20111111112",
            "sandbox": true,
            "url": {"WSFE": "http://localhost:9000/wsfe"}
        }"#;
        let config = AfipConfig::from_json_str(json).unwrap();
        assert_eq!(
            config.url_for(&AfipService::from_name("WSFE")).unwrap(),
            "http://localhost:9000/wsfe"
        );
        assert_eq!(
            config.url_for(&AfipService::Wsfe).unwrap(),
            "https://wswhomo.afip.gov.ar/wsfev1/service.asmx"
        );
    }

    #[test]
    fn test_url_for_unknown_service_is_config_error() {
        let config = AfipConfig::new("20111111112", true);
        let err = config.url_for(&AfipService::from_name("wsct")).unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
    }

    #[test]
    fn test_ticket_path_convention() {
        let config = AfipConfig::new("20111111112", true).with_ticket_dir("/var/afip/");
        assert_eq!(
            config.ticket_path(&AfipService::Wsfe),
            "/var/afip/TA-20111111112-wsfe.xml"
        );
    }

    #[test]
    fn test_wsdl_path_convention() {
        let config = AfipConfig::new("20111111112", true).with_wsdl_dir("/opt/afip/wsdl");
        assert_eq!(
            config.wsdl_path(&AfipService::Wsmtxca),
            PathBuf::from("/opt/afip/wsdl/WSMTXCA/wsmtxca.wsdl")
        );
    }

    #[test]
    fn test_from_json_accepts_numeric_cuit() {
        let json = r#"{
            "cuit": 20111111112,
            "sandbox": true,
            "dir": {"xml_generados": "/tmp/ta/"},
            "url": {"wsfe": "http://localhost:9000/wsfe"}
        }"#;
        let config = AfipConfig::from_json_str(json).unwrap();
        assert_eq!(config.cuit, "20111111112");
        assert_eq!(config.dir.xml_generados, "/tmp/ta/");
        assert_eq!(config.url["wsfe"], "http://localhost:9000/wsfe");
        assert!(config.url.contains_key("wsmtxca"));
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_validate_rejects_bad_cuit() {
        let err = AfipConfig::new("20-11111111-2", true).validate().unwrap_err();
        assert!(err.to_string().contains("CUIT must be 11 digits"));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = AfipConfig::new("20111111112", true).with_url("wsfe", "ftp://example.com");
        assert!(config.validate().is_err());

        let config = AfipConfig::new("20111111112", true).with_url("wsfe", "not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_vars() {
        let config = AfipConfig::from_vars(vars(&[
            ("AFIP_CUIT", "20111111112"),
            ("AFIP_SANDBOX", "false"),
            ("AFIP_TICKET_DIR", "/srv/ta/"),
            ("AFIP_WSDL_DIR", "/srv/wsdl"),
            ("AFIP_URL_WSFE", "https://proxy.example.com/wsfe"),
            ("AFIP_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert!(config.production());
        assert_eq!(config.dir.xml_generados, "/srv/ta/");
        assert_eq!(config.dir.wsdl, PathBuf::from("/srv/wsdl"));
        assert_eq!(config.url["wsfe"], "https://proxy.example.com/wsfe");
        assert_eq!(
            config.url["wsmtxca"],
            "https://serviciosjava.afip.gob.ar/wsmtxca/services/MTXCAService"
        );
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_from_vars_requires_cuit() {
        let err = AfipConfig::from_vars(vars(&[("AFIP_SANDBOX", "true")])).unwrap_err();
        assert!(err.to_string().contains("AFIP_CUIT is required"));
    }

    #[test]
    fn test_from_vars_defaults_to_sandbox() {
        let config = AfipConfig::from_vars(vars(&[("AFIP_CUIT", "20111111112")])).unwrap();
        assert!(config.sandbox);
    }
}
