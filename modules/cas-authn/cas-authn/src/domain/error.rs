//! Domain errors for the direct CAS client.

use std::time::Duration;

use cas_authn_sdk::CasError;

/// Internal domain errors.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("request to CAS server failed: {0}")]
    Http(String),

    #[error("CAS server did not answer within {0:?}")]
    Timeout(Duration),

    #[error("CAS server answered with HTTP {0}")]
    UnexpectedStatus(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("CAS server rejected the request [{code}]: {description}")]
    Rejected { code: String, description: String },

    #[error("proxy-granting ticket for '{iou}' not delivered within {waited:?}")]
    CorrelationTimedOut { iou: String, waited: Duration },

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl DomainError {
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    #[must_use]
    pub fn rejected(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            description: description.into(),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

impl From<DomainError> for CasError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Http(_) | DomainError::Timeout(_) | DomainError::UnexpectedStatus(_) => {
                Self::Transport(e.to_string())
            }
            DomainError::Malformed(msg) => Self::MalformedResponse(msg),
            DomainError::Rejected { code, description } => {
                Self::TicketValidationFailed { code, description }
            }
            DomainError::CorrelationTimedOut { iou, .. } => Self::CorrelationTimedOut { iou },
            DomainError::Configuration(msg) => Self::Configuration(msg),
        }
    }
}

/// Outcome of a failed claim on the correlation store.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimError {
    #[error("proxy-granting ticket not delivered yet")]
    NotYetDelivered,

    #[error("proxy-granting ticket expired before it was claimed")]
    Expired,
}
