//! Domain layer for the direct CAS client.

pub mod authenticator;
pub mod authorization;
pub mod client;
pub mod correlator;
pub mod error;
pub mod extractor;
pub mod response;
pub mod validator;

pub use authenticator::Authenticator;
pub use authorization::DefaultAuthorizationGenerator;
pub use client::{DirectCasClient, DirectCasClientBuilder};
pub use correlator::{InMemoryPgtStore, PgtStore, ProxyTicketCorrelator};
pub use error::{ClaimError, DomainError};
pub use extractor::TicketExtractor;
pub use validator::TicketValidator;
