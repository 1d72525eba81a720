//! CAS `AuthN` SDK
//!
//! This crate provides the public contract of the direct CAS client:
//!
//! - [`CasProtocol`] - Supported CAS dialects and their behaviour table
//! - [`CasAuthClient`] - Public API trait for consumers
//! - [`AuthorizationGenerator`] - Hook decorating a freshly built profile
//! - [`InboundRequest`] - Parameter lookup on the caller's request
//! - [`CasProfile`], [`ValidationResult`], [`TicketCredentials`] - Models
//! - [`CasError`] - Error taxonomy
//!
//! ## Usage
//!
//! ```ignore
//! use cas_authn_sdk::CasAuthClient;
//!
//! let profile = client.authenticate(&request).await?;
//! println!("authenticated {}", profile.id());
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod attributes;
pub mod error;
pub mod models;
pub mod protocol;
pub mod request;

// Re-export main types at crate root
pub use api::{AuthorizationGenerator, CasAuthClient};
pub use attributes::{AttributeError, AttributeKind, AttributeSchema, TypedAttribute};
pub use error::CasError;
pub use models::{Attributes, CasProfile, TicketCredentials, ValidationResult};
pub use protocol::{CasProtocol, ProtocolBehavior, ResponseFormat};
pub use request::{InboundRequest, ParameterMap};
