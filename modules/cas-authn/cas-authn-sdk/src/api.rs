//! Public API traits of the direct CAS client.

use async_trait::async_trait;

use crate::error::CasError;
use crate::models::CasProfile;
use crate::request::InboundRequest;

/// Public API trait for the direct CAS client.
///
/// ```ignore
/// let profile = client.authenticate(&request).await?;
/// if let Some(pgt) = profile.proxy_granting_ticket() {
///     // proxy-capable profile
/// }
/// ```
#[async_trait]
pub trait CasAuthClient: Send + Sync {
    /// Authenticate the ticket carried by `request`.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` if the request carries no ticket
    /// - `TicketValidationFailed` if the CAS server rejected the ticket
    /// - `CorrelationTimedOut` if the proxy-granting ticket never arrived
    /// - `Transport` / `MalformedResponse` when the CAS server misbehaves
    async fn authenticate(&self, request: &dyn InboundRequest) -> Result<CasProfile, CasError>;

    /// Request a proxy ticket for `target_service` on behalf of `profile`.
    ///
    /// # Errors
    ///
    /// - `ProxyNotSupported` if the client or profile cannot proxy
    /// - `TicketValidationFailed` if the CAS server refused the request
    /// - `Transport` / `MalformedResponse` when the CAS server misbehaves
    async fn request_proxy_ticket(
        &self,
        profile: &CasProfile,
        target_service: &str,
    ) -> Result<String, CasError>;
}

/// Decorates a freshly authenticated profile (roles, permissions, ...).
pub trait AuthorizationGenerator: Send + Sync {
    fn generate(&self, request: &dyn InboundRequest, profile: CasProfile) -> CasProfile;
}
