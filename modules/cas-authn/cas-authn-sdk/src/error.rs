//! Error types for the direct CAS client.

use thiserror::Error;

/// Errors surfaced by [`crate::CasAuthClient`] and its building blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CasError {
    /// Invalid client configuration. Raised at initialization only.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request carries no ticket (or a blank one).
    #[error("no CAS ticket in request")]
    MissingCredentials,

    /// Network failure, timeout or unexpected HTTP status talking to the CAS server.
    #[error("transport error: {0}")]
    Transport(String),

    /// The CAS server answered with a body that does not match the selected protocol.
    #[error("malformed CAS response: {0}")]
    MalformedResponse(String),

    /// The CAS server explicitly rejected the ticket.
    #[error("ticket validation failed [{code}]: {description}")]
    TicketValidationFailed { code: String, description: String },

    /// The proxy-granting ticket for `iou` was not delivered in time.
    #[error("proxy-granting ticket for IOU '{iou}' was not delivered in time")]
    CorrelationTimedOut { iou: String },

    /// Proxy tickets cannot be requested with this client or profile.
    #[error("proxy not supported: {0}")]
    ProxyNotSupported(String),
}

impl CasError {
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    #[must_use]
    pub fn validation_failed(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::TicketValidationFailed {
            code: code.into(),
            description: description.into(),
        }
    }

    /// `true` when the caller is simply not authenticated, as opposed to a
    /// malfunction of the client, the network or the CAS server.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials
                | Self::TicketValidationFailed { .. }
                | Self::CorrelationTimedOut { .. }
        )
    }
}
