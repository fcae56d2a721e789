//! SOAP 1.2 client (reqwest-based).
//!
//! A `SoapClient` is bound to one service endpoint. Calls never raise on
//! SOAP faults: a fault comes back inside [`SoapResponse`] and callers
//! inspect it. Only transport failures (connection, timeout) are errors.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};

/// SOAP 1.2 envelope namespace.
pub const SOAP12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// A SOAP fault returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub code: String,
    pub reason: String,
}

impl std::fmt::Display for SoapFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.reason)
    }
}

/// Outcome of one SOAP call.
#[derive(Debug, Clone)]
pub struct SoapResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// Fault carried by the response, if any.
    pub fault: Option<SoapFault>,
    /// Text content of every element as (local-name path, text).
    texts: Vec<(Vec<String>, String)>,
}

impl SoapResponse {
    fn from_http(status: u16, body: String) -> Self {
        let (texts, fault_seen) = match scan_texts(&body) {
            Ok(scanned) => scanned,
            Err(e) => {
                debug!(error = %e, "Response body is not XML");
                (Vec::new(), false)
            }
        };

        let fault = if fault_seen {
            Some(SoapFault {
                code: find_fault_part(&texts, &[&["Code", "Value"], &["faultcode"]])
                    .unwrap_or_else(|| "soap:Receiver".to_string()),
                reason: find_fault_part(&texts, &[&["Reason", "Text"], &["faultstring"]])
                    .unwrap_or_default(),
            })
        } else if !(200..300).contains(&status) {
            Some(SoapFault {
                code: format!("HTTP {status}"),
                reason: body.chars().take(512).collect(),
            })
        } else {
            None
        };

        Self {
            status,
            body,
            fault,
            texts,
        }
    }

    #[must_use]
    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }

    /// Text of the first element with the given local name.
    #[must_use]
    pub fn find_text(&self, local_name: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|(path, _)| path.last().is_some_and(|l| l == local_name))
            .map(|(_, text)| text.as_str())
    }

    /// Like [`Self::find_text`], ignoring ASCII case.
    #[must_use]
    pub fn find_text_ignore_case(&self, local_name: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|(path, _)| path.last().is_some_and(|l| l.eq_ignore_ascii_case(local_name)))
            .map(|(_, text)| text.as_str())
    }
}

fn find_fault_part(texts: &[(Vec<String>, String)], suffixes: &[&[&str]]) -> Option<String> {
    suffixes.iter().find_map(|suffix| {
        texts
            .iter()
            .find(|(path, _)| {
                path.iter().any(|p| p == "Fault")
                    && path.len() >= suffix.len()
                    && path[path.len() - suffix.len()..]
                        .iter()
                        .zip(suffix.iter())
                        .all(|(a, b)| a == b)
            })
            .map(|(_, text)| text.clone())
    })
}

/// Collect element texts and whether a `Fault` element was present.
fn scan_texts(xml: &str) -> Result<(Vec<(Vec<String>, String)>, bool), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut texts = Vec::new();
    let mut fault_seen = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let local = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                fault_seen |= local == "Fault";
                stack.push(local);
            }
            Event::Empty(ref e) => {
                fault_seen |= e.local_name().into_inner() == b"Fault";
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(ref e) => {
                if !stack.is_empty() {
                    texts.push((stack.clone(), e.unescape()?.to_string()));
                }
            }
            Event::CData(ref e) => {
                if !stack.is_empty() {
                    texts.push((stack.clone(), String::from_utf8_lossy(e).to_string()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((texts, fault_seen))
}

/// Read the `targetNamespace` attribute of a WSDL's root element.
fn read_target_namespace(wsdl: &str) -> Option<String> {
    let mut reader = Reader::from_str(wsdl);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                return e.attributes().flatten().find_map(|attr| {
                    (attr.key.local_name().into_inner() == b"targetNamespace")
                        .then(|| String::from_utf8_lossy(&attr.value).to_string())
                });
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// One traced request/response pair.
#[derive(Debug, Clone, Default)]
pub struct SoapExchange {
    pub operation: String,
    pub request: String,
    pub status: Option<u16>,
    pub response: Option<String>,
}

/// SOAP 1.2 client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct SoapClient {
    endpoint: String,
    wsdl_path: PathBuf,
    target_namespace: String,
    http_client: Client,
    trace: bool,
    /// Last exchange, kept when tracing is enabled (shared across clones).
    last_exchange: Arc<RwLock<Option<SoapExchange>>>,
}

impl SoapClient {
    /// Create a client for `endpoint`, described by the WSDL at `wsdl_path`.
    pub async fn connect(
        wsdl_path: &Path,
        endpoint: &str,
        timeout: Duration,
        trace: bool,
    ) -> AuthResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("afip-auth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Config(format!("Failed to build HTTP client: {e}")))?;

        Self::with_http_client(wsdl_path, endpoint, http_client, trace).await
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub async fn with_http_client(
        wsdl_path: &Path,
        endpoint: &str,
        http_client: Client,
        trace: bool,
    ) -> AuthResult<Self> {
        let wsdl = tokio::fs::read_to_string(wsdl_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AuthError::MissingArtifact {
                    path: wsdl_path.display().to_string(),
                }
            } else {
                AuthError::Config(format!("Cannot read '{}': {e}", wsdl_path.display()))
            }
        })?;

        let target_namespace = read_target_namespace(&wsdl).unwrap_or_else(|| {
            warn!(
                wsdl = %wsdl_path.display(),
                "WSDL has no targetNamespace, using endpoint URL"
            );
            endpoint.to_string()
        });

        Ok(Self {
            endpoint: endpoint.to_string(),
            wsdl_path: wsdl_path.to_path_buf(),
            target_namespace,
            http_client,
            trace,
            last_exchange: Arc::new(RwLock::new(None)),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn wsdl_path(&self) -> &Path {
        &self.wsdl_path
    }

    #[must_use]
    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    #[must_use]
    pub fn trace_enabled(&self) -> bool {
        self.trace
    }

    /// SOAP action for `operation`.
    #[must_use]
    pub fn action(&self, operation: &str) -> String {
        if self.target_namespace.ends_with('/') {
            format!("{}{operation}", self.target_namespace)
        } else {
            format!("{}/{operation}", self.target_namespace)
        }
    }

    /// Wrap `body` in an envelope whose body element is `operation`.
    #[must_use]
    pub fn envelope(&self, operation: &str, body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><soap12:Envelope xmlns:soap12="{SOAP12_ENVELOPE_NS}"><soap12:Body><{operation} xmlns="{ns}">{body}</{operation}></soap12:Body></soap12:Envelope>"#,
            ns = quick_xml::escape::escape(&self.target_namespace),
        )
    }

    /// Invoke `operation` with the given body fragment.
    ///
    /// Faults and non-2xx statuses are returned in the response, not raised.
    pub async fn call(&self, operation: &str, body: &str) -> AuthResult<SoapResponse> {
        let envelope = self.envelope(operation, body);
        let content_type = format!(
            "application/soap+xml; charset=utf-8; action=\"{}\"",
            self.action(operation)
        );

        if self.trace {
            *self.last_exchange.write().await = Some(SoapExchange {
                operation: operation.to_string(),
                request: envelope.clone(),
                ..SoapExchange::default()
            });
        }

        debug!(endpoint = %self.endpoint, operation, "SOAP call");
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(envelope)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if self.trace {
            if let Some(exchange) = self.last_exchange.write().await.as_mut() {
                exchange.status = Some(status);
                exchange.response = Some(body.clone());
            }
        }

        let response = SoapResponse::from_http(status, body);
        if let Some(fault) = &response.fault {
            debug!(endpoint = %self.endpoint, operation, status, %fault, "SOAP fault");
        }
        Ok(response)
    }

    /// Last traced exchange, if tracing is enabled and a call was made.
    pub async fn last_exchange(&self) -> Option<SoapExchange> {
        self.last_exchange.read().await.clone()
    }

    pub async fn last_request(&self) -> Option<String> {
        self.last_exchange().await.map(|e| e.request)
    }

    pub async fn last_response(&self) -> Option<String> {
        self.last_exchange().await.and_then(|e| e.response)
    }
}
