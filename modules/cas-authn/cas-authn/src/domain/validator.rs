//! Ticket validation against the CAS server.

use std::sync::Arc;

use bytes::Bytes;
use cas_authn_sdk::{ResponseFormat, ValidationResult};
use http::{Request, header};
use http_body_util::{BodyExt, Empty, LengthLimitError, Limited};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;
use url::Url;

use super::error::DomainError;
use super::response;
use crate::config::{CasConfig, StructuredFormat};

type HttpsClient = Client<HttpsConnector<HttpConnector>, Empty<Bytes>>;

const USER_AGENT: &str = concat!("cas-authn/", env!("CARGO_PKG_VERSION"));

/// Endpoint issuing proxy tickets from a proxy-granting ticket.
const PROXY_ENDPOINT: &str = "proxy";

/// Largest response body accepted from the CAS server.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Calls the CAS validation endpoint of the configured dialect and
/// interprets its answer.
pub struct TicketValidator {
    config: Arc<CasConfig>,
    client: HttpsClient,
}

impl TicketValidator {
    /// # Errors
    ///
    /// `Configuration` if the TLS stack cannot be set up.
    pub fn new(config: Arc<CasConfig>) -> Result<Self, DomainError> {
        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::aws_lc_rs::default_provider())
            .map_err(|e| DomainError::Configuration(format!("TLS setup failed: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);

        Ok(Self { config, client })
    }

    /// Validate `ticket` for `service_url`.
    ///
    /// The call is bounded by `validation_timeout` and never retried.
    ///
    /// # Errors
    ///
    /// - `Http` / `Timeout` / `UnexpectedStatus` when the CAS server cannot be reached
    /// - `Malformed` when the body does not match the configured dialect
    /// - `Rejected` when the CAS server refuses the ticket or the proxy chain
    #[tracing::instrument(
        skip_all,
        fields(protocol = %self.config.protocol, service = %service_url)
    )]
    pub async fn validate(
        &self,
        ticket: &str,
        service_url: &str,
    ) -> Result<ValidationResult, DomainError> {
        let url = self.validation_url(ticket, service_url)?;
        let body = self.fetch(url).await?;
        let result = self.parse(&body)?;
        self.check_proxy_chain(&result)?;

        debug!(
            principal = %result.principal,
            attributes = result.attributes.len(),
            has_pgt_iou = result.pgt_iou.is_some(),
            proxies = result.proxies.len(),
            "ticket validated"
        );
        Ok(result)
    }

    /// Ask the CAS server for a proxy ticket valid for `target_service`.
    ///
    /// # Errors
    ///
    /// Same families as [`Self::validate`]; `Rejected` carries the
    /// `proxyFailure` code.
    #[tracing::instrument(skip_all, fields(target_service = %target_service))]
    pub async fn request_proxy_ticket(
        &self,
        pgt: &str,
        target_service: &str,
    ) -> Result<String, DomainError> {
        let mut url = endpoint_url(&self.config.server_url, PROXY_ENDPOINT)?;
        url.query_pairs_mut()
            .append_pair("targetService", target_service)
            .append_pair("pgt", pgt);

        let body = self.fetch(url).await?;
        let ticket = response::parse_proxy_xml(&body)?;
        debug!("proxy ticket issued");
        Ok(ticket)
    }

    /// `<server>/<endpoint>?service=…&ticket=…[&pgtUrl=…][&format=JSON]`
    fn validation_url(&self, ticket: &str, service_url: &str) -> Result<Url, DomainError> {
        let behavior = self.config.protocol.behavior();
        let mut url = endpoint_url(&self.config.server_url, behavior.endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("service", service_url)
                .append_pair("ticket", ticket);
            if behavior.sends_pgt_callback
                && let Some(proxy) = &self.config.proxy
            {
                query.append_pair("pgtUrl", &proxy.callback_url);
            }
            if behavior.supports_json && self.config.response_format == StructuredFormat::Json {
                query.append_pair("format", "JSON");
            }
        }
        Ok(url)
    }

    fn parse(&self, body: &str) -> Result<ValidationResult, DomainError> {
        match (
            self.config.protocol.behavior().format,
            self.config.response_format,
        ) {
            (ResponseFormat::Legacy, _) => response::parse_legacy(body),
            (ResponseFormat::Structured, StructuredFormat::Xml) => response::parse_xml(body),
            (ResponseFormat::Structured, StructuredFormat::Json) => response::parse_json(body),
        }
    }

    fn check_proxy_chain(&self, result: &ValidationResult) -> Result<(), DomainError> {
        if result.proxies.is_empty() {
            return Ok(());
        }
        if !self.config.protocol.behavior().accepts_proxy_chain {
            return Err(DomainError::malformed(format!(
                "{} response must not carry a proxy chain",
                self.config.protocol
            )));
        }
        if self.config.accept_any_proxy
            || self.config.allowed_proxy_chains.contains(&result.proxies)
        {
            return Ok(());
        }
        Err(DomainError::rejected(
            "INVALID_PROXY_CHAIN",
            format!("proxy chain {:?} is not allowed", result.proxies),
        ))
    }

    async fn fetch(&self, url: Url) -> Result<String, DomainError> {
        let request = Request::get(url.as_str())
            .header(header::ACCEPT, "application/xml, application/json, text/plain")
            .header(header::USER_AGENT, USER_AGENT)
            .body(Empty::<Bytes>::new())
            .map_err(|e| DomainError::Http(e.to_string()))?;

        let timeout = self.config.validation_timeout;
        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| DomainError::Http(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(DomainError::UnexpectedStatus(status.as_u16()));
            }

            let body = Limited::new(response.into_body(), MAX_RESPONSE_BYTES)
                .collect()
                .await
                .map_err(|e| {
                    if e.downcast_ref::<LengthLimitError>().is_some() {
                        DomainError::malformed(format!(
                            "response exceeds {MAX_RESPONSE_BYTES} bytes"
                        ))
                    } else {
                        DomainError::Http(e.to_string())
                    }
                })?
                .to_bytes();
            String::from_utf8(body.to_vec())
                .map_err(|e| DomainError::malformed(format!("response is not UTF-8: {e}")))
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| DomainError::Timeout(timeout))?
    }
}

fn endpoint_url(server_url: &str, endpoint: &str) -> Result<Url, DomainError> {
    let raw = format!("{}/{endpoint}", server_url.trim_end_matches('/'));
    Url::parse(&raw)
        .map_err(|e| DomainError::Configuration(format!("invalid CAS URL '{raw}': {e}")))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashMap;

    use cas_authn_sdk::CasProtocol;

    use super::*;
    use crate::config::ProxyConfig;

    fn validator(cfg: CasConfig) -> TicketValidator {
        TicketValidator::new(Arc::new(cfg)).unwrap()
    }

    fn config(protocol: CasProtocol) -> CasConfig {
        CasConfig {
            service_url: "https://svc.example.org/app".to_owned(),
            ..CasConfig::new("https://cas.example.org/cas/", protocol)
        }
    }

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[tokio::test]
    async fn url_per_dialect() {
        for (protocol, path) in [
            (CasProtocol::Cas10, "/cas/validate"),
            (CasProtocol::Cas20, "/cas/serviceValidate"),
            (CasProtocol::Cas20Proxy, "/cas/proxyValidate"),
            (CasProtocol::Cas30, "/cas/p3/serviceValidate"),
            (CasProtocol::Cas30Proxy, "/cas/p3/proxyValidate"),
        ] {
            let url = validator(config(protocol))
                .validation_url("ST-1", "https://svc.example.org/app?x=1&y=2")
                .unwrap();
            assert_eq!(url.path(), path, "{protocol}");

            let q = query(&url);
            assert_eq!(q["service"], "https://svc.example.org/app?x=1&y=2");
            assert_eq!(q["ticket"], "ST-1");
            assert!(!q.contains_key("pgtUrl"));
            assert!(!q.contains_key("format"));
        }
    }

    #[tokio::test]
    async fn proxy_dialect_sends_callback() {
        let cfg = CasConfig {
            proxy: Some(ProxyConfig::new("https://svc.example.org/cas/proxy-callback")),
            ..config(CasProtocol::Cas30Proxy)
        };
        let url = validator(cfg).validation_url("PT-1", "https://svc.example.org/app").unwrap();
        assert_eq!(
            query(&url)["pgtUrl"],
            "https://svc.example.org/cas/proxy-callback"
        );
    }

    #[tokio::test]
    async fn json_format_is_requested_on_cas30() {
        let cfg = CasConfig {
            response_format: StructuredFormat::Json,
            ..config(CasProtocol::Cas30)
        };
        let url = validator(cfg).validation_url("ST-1", "https://svc.example.org/").unwrap();
        assert_eq!(query(&url)["format"], "JSON");
    }

    #[tokio::test]
    async fn proxy_chain_policy() {
        let mut result = ValidationResult::new("alice");
        result.proxies = vec!["https://proxy1.example.org/pgtUrl".to_owned()];

        // proxy chains are never expected from a service ticket endpoint
        assert!(matches!(
            validator(config(CasProtocol::Cas30)).check_proxy_chain(&result),
            Err(DomainError::Malformed(_))
        ));

        assert!(
            validator(config(CasProtocol::Cas30Proxy))
                .check_proxy_chain(&result)
                .is_ok()
        );

        let restricted = CasConfig {
            accept_any_proxy: false,
            allowed_proxy_chains: vec![vec!["https://trusted.example.org/pgtUrl".to_owned()]],
            ..config(CasProtocol::Cas30Proxy)
        };
        let err = validator(restricted.clone())
            .check_proxy_chain(&result)
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Rejected { ref code, .. } if code == "INVALID_PROXY_CHAIN"
        ));

        result.proxies = vec!["https://trusted.example.org/pgtUrl".to_owned()];
        assert!(validator(restricted).check_proxy_chain(&result).is_ok());
    }

    #[tokio::test]
    async fn unreachable_server_is_http_error() {
        let cfg = CasConfig {
            validation_timeout: std::time::Duration::from_secs(2),
            ..CasConfig::new("http://127.0.0.1:1/cas", CasProtocol::Cas30)
        };
        let err = validator(cfg)
            .validate("ST-1", "https://svc.example.org/")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Http(_) | DomainError::Timeout(_)));
    }
}
