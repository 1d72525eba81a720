//! Direct CAS client
//!
//! Authenticates requests by validating the CAS ticket they carry, without
//! sessions or redirects. Proxy dialects additionally correlate the
//! proxy-granting ticket the CAS server delivers to the receptor endpoint,
//! so the resulting profile can request proxy tickets for back-end services.
//!
//! ```ignore
//! let client = DirectCasClient::new(config)?;
//! let router = api::rest::register_routes(router, DEFAULT_CALLBACK_PATH,
//!     Arc::clone(client.correlator().unwrap()));
//! let profile = client.authenticate(&request).await?;
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;

pub use api::rest::DEFAULT_CALLBACK_PATH;
pub use config::{CasConfig, ProxyConfig, StructuredFormat};
pub use domain::{
    DirectCasClient, DirectCasClientBuilder, InMemoryPgtStore, PgtStore, ProxyTicketCorrelator,
};
