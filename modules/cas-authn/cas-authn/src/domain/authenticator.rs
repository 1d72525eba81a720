//! Ticket authentication: validation followed, on proxy dialects, by
//! proxy-granting ticket correlation.

use std::sync::Arc;
use std::time::Duration;

use cas_authn_sdk::{CasProfile, TicketCredentials};
use tracing::{debug, warn};

use super::correlator::ProxyTicketCorrelator;
use super::error::DomainError;
use super::validator::TicketValidator;

/// Correlator plus the bound on how long to wait for a delivery.
struct Correlation {
    correlator: Arc<ProxyTicketCorrelator>,
    claim_timeout: Duration,
}

/// Turns extracted credentials into a profile.
///
/// Holds no per-request state; one instance serves all requests.
pub struct Authenticator {
    validator: TicketValidator,
    correlation: Option<Correlation>,
}

impl Authenticator {
    #[must_use]
    pub fn new(validator: TicketValidator) -> Self {
        Self {
            validator,
            correlation: None,
        }
    }

    /// Wait up to `claim_timeout` for the proxy-granting ticket of every
    /// validation that returns a PGT IOU.
    #[must_use]
    pub fn with_correlator(
        mut self,
        correlator: Arc<ProxyTicketCorrelator>,
        claim_timeout: Duration,
    ) -> Self {
        self.correlation = Some(Correlation {
            correlator,
            claim_timeout,
        });
        self
    }

    #[must_use]
    pub fn validator(&self) -> &TicketValidator {
        &self.validator
    }

    /// # Errors
    ///
    /// Validation errors as returned by [`TicketValidator::validate`], and
    /// `CorrelationTimedOut` when the proxy-granting ticket does not arrive
    /// within the configured bound.
    pub async fn authenticate(
        &self,
        credentials: &TicketCredentials,
    ) -> Result<CasProfile, DomainError> {
        let mut result = self
            .validator
            .validate(&credentials.ticket, &credentials.service_url)
            .await?;

        let Some(correlation) = &self.correlation else {
            return Ok(CasProfile::from_validation(result));
        };

        let Some(iou) = result.pgt_iou.take() else {
            warn!(
                principal = %result.principal,
                "proxy validation succeeded without a PGT IOU; profile cannot request proxy tickets"
            );
            return Ok(CasProfile::from_validation(result));
        };

        debug!(pgt_iou = %iou, "awaiting proxy-granting ticket");
        let pgt = correlation
            .correlator
            .await_claim(&iou, correlation.claim_timeout)
            .await?;
        debug!(pgt_iou = %iou, principal = %result.principal, "proxy-granting ticket correlated");

        Ok(CasProfile::from_validation(result).with_proxy_granting_ticket(pgt))
    }
}
