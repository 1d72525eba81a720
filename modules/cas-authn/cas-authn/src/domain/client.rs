//! Direct CAS client: the single entry point wiring configuration,
//! extraction, authentication and authorization together.

use std::sync::Arc;

use async_trait::async_trait;
use cas_authn_sdk::{
    AuthorizationGenerator, CasAuthClient, CasError, CasProfile, InboundRequest,
};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use super::DomainError;
use super::authenticator::Authenticator;
use super::authorization::DefaultAuthorizationGenerator;
use super::correlator::{PgtStore, ProxyTicketCorrelator};
use super::extractor::TicketExtractor;
use super::validator::TicketValidator;
use crate::config::CasConfig;

/// Sessionless CAS client authenticating each request by its ticket.
///
/// Built once from a [`CasConfig`]; every configuration problem surfaces
/// from [`DirectCasClientBuilder::build`], never from a request.
pub struct DirectCasClient {
    config: Arc<CasConfig>,
    extractor: TicketExtractor,
    authenticator: Authenticator,
    correlator: Option<Arc<ProxyTicketCorrelator>>,
    generators: Vec<Arc<dyn AuthorizationGenerator>>,
}

impl DirectCasClient {
    /// Client with the in-memory correlator (when proxying is configured)
    /// and only the default authorization step.
    ///
    /// # Errors
    ///
    /// `Configuration` if `config` is invalid.
    pub fn new(config: CasConfig) -> Result<Self, CasError> {
        Self::builder(config).build()
    }

    #[must_use]
    pub fn builder(config: CasConfig) -> DirectCasClientBuilder {
        DirectCasClientBuilder {
            config,
            correlator: None,
            store: None,
            generators: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    /// Correlator fed by the receptor endpoint, present on proxy clients.
    #[must_use]
    pub fn correlator(&self) -> Option<&Arc<ProxyTicketCorrelator>> {
        self.correlator.as_ref()
    }

    fn authorize(&self, request: &dyn InboundRequest, profile: CasProfile) -> CasProfile {
        self.generators
            .iter()
            .fold(profile, |profile, generator| generator.generate(request, profile))
    }
}

fn log_and_convert(op: &str, e: DomainError) -> CasError {
    match &e {
        DomainError::Rejected { .. } | DomainError::CorrelationTimedOut { .. } => {
            tracing::warn!(operation = op, error = %e, "CAS authentication rejected");
        }
        _ => tracing::error!(operation = op, error = %e, "CAS call failed"),
    }
    e.into()
}

#[async_trait]
impl CasAuthClient for DirectCasClient {
    #[tracing::instrument(skip_all, fields(protocol = %self.config.protocol))]
    async fn authenticate(&self, request: &dyn InboundRequest) -> Result<CasProfile, CasError> {
        let credentials = self.extractor.extract(request).inspect_err(|e| {
            debug!(error = %e, "no usable ticket in request");
        })?;

        let profile = self
            .authenticator
            .authenticate(&credentials)
            .await
            .map_err(|e| log_and_convert("authenticate", e))?;

        let profile = self.authorize(request, profile);
        info!(
            principal = %profile.id(),
            proxy_capable = profile.proxy_granting_ticket().is_some(),
            "CAS ticket authenticated"
        );
        Ok(profile)
    }

    async fn request_proxy_ticket(
        &self,
        profile: &CasProfile,
        target_service: &str,
    ) -> Result<String, CasError> {
        if !self.config.protocol.is_proxy() {
            return Err(CasError::ProxyNotSupported(format!(
                "client is configured with non-proxy protocol {}",
                self.config.protocol
            )));
        }
        let pgt = profile.proxy_granting_ticket().ok_or_else(|| {
            CasError::ProxyNotSupported(format!(
                "profile '{}' has no proxy-granting ticket",
                profile.id()
            ))
        })?;

        self.authenticator
            .validator()
            .request_proxy_ticket(pgt.expose_secret(), target_service)
            .await
            .map_err(|e| log_and_convert("request_proxy_ticket", e))
    }
}

/// Builder for [`DirectCasClient`].
pub struct DirectCasClientBuilder {
    config: CasConfig,
    correlator: Option<Arc<ProxyTicketCorrelator>>,
    store: Option<Arc<dyn PgtStore>>,
    generators: Vec<Arc<dyn AuthorizationGenerator>>,
}

impl DirectCasClientBuilder {
    /// Share an existing correlator, e.g. one already mounted on a receptor
    /// endpoint.
    #[must_use]
    pub fn correlator(mut self, correlator: Arc<ProxyTicketCorrelator>) -> Self {
        self.correlator = Some(correlator);
        self
    }

    /// Back the correlator with a custom store instead of the in-memory one.
    #[must_use]
    pub fn pgt_store(mut self, store: Arc<dyn PgtStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Run `generator` after the default authorization step.
    #[must_use]
    pub fn authorization_generator(mut self, generator: Arc<dyn AuthorizationGenerator>) -> Self {
        self.generators.push(generator);
        self
    }

    /// # Errors
    ///
    /// `Configuration` if the configuration is invalid, or if a correlator
    /// or store was supplied for a client that does not proxy.
    pub fn build(self) -> Result<DirectCasClient, CasError> {
        self.config.validate()?;

        let correlates = self.config.correlates_proxy_tickets();
        if !correlates && (self.correlator.is_some() || self.store.is_some()) {
            return Err(CasError::configuration(
                "a proxy correlator requires a proxy protocol and a `proxy` section",
            ));
        }

        let config = Arc::new(self.config);
        let extractor =
            TicketExtractor::new(config.ticket_parameter.clone(), config.service_url.clone());
        let validator = TicketValidator::new(Arc::clone(&config))?;
        let mut authenticator = Authenticator::new(validator);

        let correlator = match (&config.proxy, self.correlator, self.store) {
            (Some(proxy), Some(correlator), _) => {
                authenticator =
                    authenticator.with_correlator(Arc::clone(&correlator), proxy.claim_timeout);
                Some(correlator)
            }
            (Some(proxy), None, store) => {
                let correlator = Arc::new(match store {
                    Some(store) => ProxyTicketCorrelator::with_store(store),
                    None => ProxyTicketCorrelator::new(proxy.ticket_ttl),
                });
                authenticator =
                    authenticator.with_correlator(Arc::clone(&correlator), proxy.claim_timeout);
                Some(correlator)
            }
            (None, _, _) => None,
        };

        let mut generators: Vec<Arc<dyn AuthorizationGenerator>> =
            vec![Arc::new(DefaultAuthorizationGenerator::new(
                config.default_roles.clone(),
                config.default_permissions.clone(),
            ))];
        generators.extend(self.generators);

        info!(
            server_url = %config.server_url,
            protocol = %config.protocol,
            proxy = correlator.is_some(),
            "direct CAS client initialized"
        );

        Ok(DirectCasClient {
            config,
            extractor,
            authenticator,
            correlator,
            generators,
        })
    }
}
