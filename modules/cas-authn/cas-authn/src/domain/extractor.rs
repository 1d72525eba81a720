//! Ticket extraction from inbound requests.

use cas_authn_sdk::{CasError, InboundRequest, TicketCredentials};

/// Pulls the CAS ticket out of a single named request parameter.
///
/// Only the query parameter is consulted, never headers or bodies. The
/// service URL is always the configured one.
#[derive(Debug, Clone)]
pub struct TicketExtractor {
    parameter: String,
    service_url: String,
}

impl TicketExtractor {
    #[must_use]
    pub fn new(parameter: impl Into<String>, service_url: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            service_url: service_url.into(),
        }
    }

    /// # Errors
    ///
    /// `MissingCredentials` if the parameter is absent or blank.
    pub fn extract(&self, request: &dyn InboundRequest) -> Result<TicketCredentials, CasError> {
        let ticket = request
            .parameter(&self.parameter)
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(CasError::MissingCredentials)?;

        Ok(TicketCredentials {
            ticket,
            service_url: self.service_url.clone(),
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use cas_authn_sdk::ParameterMap;

    use super::*;

    fn extractor() -> TicketExtractor {
        TicketExtractor::new("ticket", "https://svc.example.org/")
    }

    #[test]
    fn extracts_ticket_parameter() {
        let creds = extractor()
            .extract(&ParameterMap::new().with("ticket", "ST-123"))
            .unwrap();
        assert_eq!(creds.ticket, "ST-123");
        assert_eq!(creds.service_url, "https://svc.example.org/");
    }

    #[test]
    fn missing_or_blank_ticket_is_missing_credentials() {
        for req in [
            ParameterMap::new(),
            ParameterMap::new().with("ticket", ""),
            ParameterMap::new().with("ticket", "   "),
            ParameterMap::new().with("other", "ST-123"),
        ] {
            assert_eq!(
                extractor().extract(&req).unwrap_err(),
                CasError::MissingCredentials
            );
        }
    }

    #[test]
    fn ticket_in_header_is_ignored() {
        let req = http::Request::builder()
            .uri("/resource")
            .header("ticket", "ST-123")
            .body(())
            .unwrap();
        assert_eq!(
            extractor().extract(&req).unwrap_err(),
            CasError::MissingCredentials
        );
    }

    #[test]
    fn custom_parameter_name() {
        let extractor = TicketExtractor::new("casTicket", "https://svc.example.org/");
        let req = ParameterMap::new()
            .with("ticket", "ST-1")
            .with("casTicket", "ST-2");
        assert_eq!(extractor.extract(&req).unwrap().ticket, "ST-2");
    }

    #[test]
    fn request_host_never_changes_service_url() {
        let req = http::Request::builder()
            .uri("https://b.example.org/app?ticket=ST-1")
            .header(http::header::HOST, "b.example.org")
            .header("x-forwarded-proto", "http")
            .body(())
            .unwrap();

        let creds = extractor().extract(&req).unwrap();
        assert_eq!(creds.ticket, "ST-1");
        assert_eq!(creds.service_url, "https://svc.example.org/");
    }
}
