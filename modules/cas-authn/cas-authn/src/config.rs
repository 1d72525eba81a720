//! Configuration for the direct CAS client.

use std::time::Duration;

use cas_authn_sdk::{CasError, CasProtocol};
use serde::{Deserialize, Serialize};
use url::Url;

/// Name of the request parameter carrying the ticket, by CAS convention.
pub const TICKET_PARAMETER: &str = "ticket";

/// Structured response format requested from the CAS server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredFormat {
    #[default]
    Xml,
    /// CAS 3.0 only (`format=JSON`).
    Json,
}

/// Client configuration.
///
/// ```yaml
/// server_url: "https://cas.example.org/cas"
/// protocol: CAS30_PROXY
/// service_url: "https://api.example.org/"
/// validation_timeout: "10s"
/// proxy:
///   callback_url: "https://api.example.org/cas/proxy-callback"
///   claim_timeout: "1s"
///   ticket_ttl: "60s"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CasConfig {
    /// CAS server prefix, e.g. `https://cas.example.org/cas`.
    pub server_url: String,

    pub protocol: CasProtocol,

    /// Service URL this client identifies itself as. Required; it is never
    /// derived from a request.
    pub service_url: String,

    pub response_format: StructuredFormat,

    /// Upper bound on the outbound validation call.
    #[serde(with = "humantime_serde")]
    pub validation_timeout: Duration,

    /// Proxy-granting ticket correlation. Only legal on proxy dialects.
    pub proxy: Option<ProxyConfig>,

    /// When `false`, a proxied ticket is accepted only if its chain is one
    /// of `allowed_proxy_chains`.
    pub accept_any_proxy: bool,

    pub allowed_proxy_chains: Vec<Vec<String>>,

    /// Baseline roles attached to every authenticated profile.
    pub default_roles: Vec<String>,

    pub default_permissions: Vec<String>,

    pub ticket_parameter: String,
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            protocol: CasProtocol::default(),
            service_url: String::new(),
            response_format: StructuredFormat::default(),
            validation_timeout: Duration::from_secs(10),
            proxy: None,
            accept_any_proxy: true,
            allowed_proxy_chains: Vec::new(),
            default_roles: vec!["ROLE_USER".to_owned()],
            default_permissions: Vec::new(),
            ticket_parameter: TICKET_PARAMETER.to_owned(),
        }
    }
}

/// Proxy-granting ticket correlation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    /// Absolute URL of the receptor endpoint, sent to the CAS server as `pgtUrl`.
    pub callback_url: String,

    /// How long an authentication waits for the proxy-granting ticket.
    #[serde(with = "humantime_serde")]
    pub claim_timeout: Duration,

    /// How long an undelivered or unclaimed correlation entry is kept.
    #[serde(with = "humantime_serde")]
    pub ticket_ttl: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            callback_url: String::new(),
            claim_timeout: Duration::from_secs(1),
            ticket_ttl: Duration::from_secs(60),
        }
    }
}

impl CasConfig {
    #[must_use]
    pub fn new(server_url: impl Into<String>, protocol: CasProtocol) -> Self {
        Self {
            server_url: server_url.into(),
            protocol,
            ..Self::default()
        }
    }

    /// Check the configuration once, before any request is served.
    ///
    /// The outcome depends on the configuration alone.
    ///
    /// # Errors
    ///
    /// `Configuration` describing the first problem found.
    pub fn validate(&self) -> Result<(), CasError> {
        if self.server_url.trim().is_empty() {
            return Err(CasError::configuration("server_url must not be blank"));
        }
        Url::parse(&self.server_url).map_err(|e| {
            CasError::configuration(format!("server_url '{}' is invalid: {e}", self.server_url))
        })?;

        let behavior = self.protocol.behavior();

        if self.service_url.trim().is_empty() {
            return Err(CasError::configuration(format!(
                "protocol {} requires a non-blank service_url",
                self.protocol
            )));
        }
        let service = Url::parse(&self.service_url).map_err(|e| {
            CasError::configuration(format!("service_url '{}' is invalid: {e}", self.service_url))
        })?;
        if !matches!(service.scheme(), "http" | "https") {
            return Err(CasError::configuration("service_url must be an http(s) URL"));
        }

        if self.response_format == StructuredFormat::Json && !behavior.supports_json {
            return Err(CasError::configuration(format!(
                "protocol {} does not support JSON responses",
                self.protocol
            )));
        }

        if self.validation_timeout.is_zero() {
            return Err(CasError::configuration(
                "validation_timeout must be greater than zero",
            ));
        }

        if self.ticket_parameter.trim().is_empty() {
            return Err(CasError::configuration("ticket_parameter must not be blank"));
        }

        if let Some(proxy) = &self.proxy {
            if !self.protocol.is_proxy() {
                return Err(CasError::configuration(format!(
                    "proxy correlation requires CAS20_PROXY or CAS30_PROXY, got {}",
                    self.protocol
                )));
            }
            proxy.validate()?;
        }

        Ok(())
    }

    /// `true` when validation calls send `pgtUrl` and wait for a proxy-granting ticket.
    #[must_use]
    pub fn correlates_proxy_tickets(&self) -> bool {
        self.protocol.is_proxy() && self.proxy.is_some()
    }
}

impl ProxyConfig {
    #[must_use]
    pub fn new(callback_url: impl Into<String>) -> Self {
        Self {
            callback_url: callback_url.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), CasError> {
        let url = Url::parse(&self.callback_url).map_err(|e| {
            CasError::configuration(format!(
                "proxy.callback_url '{}' is invalid: {e}",
                self.callback_url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CasError::configuration(
                "proxy.callback_url must be an http(s) URL",
            ));
        }
        if self.claim_timeout.is_zero() {
            return Err(CasError::configuration(
                "proxy.claim_timeout must be greater than zero",
            ));
        }
        if self.ticket_ttl < self.claim_timeout {
            return Err(CasError::configuration(
                "proxy.ticket_ttl must not be shorter than proxy.claim_timeout",
            ));
        }
        Ok(())
    }
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
