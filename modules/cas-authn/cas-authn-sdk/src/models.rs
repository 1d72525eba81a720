//! Domain models for the direct CAS client.

use std::collections::{BTreeMap, BTreeSet};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Attributes released by the CAS server: name → one or more values.
///
/// Multi-valued attributes keep the order in which the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Vec<String>>);

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the values of `name`.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// First value of `name`, the usual way to read a single-valued attribute.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.push(k, v);
        }
        attrs
    }
}

/// A ticket pulled out of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketCredentials {
    /// Raw ticket value (`ST-…` or `PT-…`). Never blank.
    pub ticket: String,
    /// Service URL the ticket must be validated against.
    pub service_url: String,
}

/// Outcome of a successful validation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Principal identifier returned by the CAS server.
    pub principal: String,
    pub attributes: Attributes,
    /// Proxy-granting ticket IOU, only present on proxy dialects when a
    /// callback URL was sent.
    pub pgt_iou: Option<String>,
    /// Proxies the ticket passed through, most recent first.
    pub proxies: Vec<String>,
}

impl ValidationResult {
    #[must_use]
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            attributes: Attributes::new(),
            pgt_iou: None,
            proxies: Vec::new(),
        }
    }
}

/// The authenticated identity returned to the caller.
///
/// Built once by the authenticator; authorization generators decorate it by
/// value through the `with_*` methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasProfile {
    id: String,
    attributes: Attributes,
    /// Resolved proxy-granting ticket. Never serialized; `Debug` redacts it.
    #[serde(skip)]
    proxy_granting_ticket: Option<SecretString>,
    #[serde(default)]
    proxies: Vec<String>,
    #[serde(default)]
    roles: BTreeSet<String>,
    #[serde(default)]
    permissions: BTreeSet<String>,
}

impl CasProfile {
    #[must_use]
    pub fn new(id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id: id.into(),
            attributes,
            proxy_granting_ticket: None,
            proxies: Vec::new(),
            roles: BTreeSet::new(),
            permissions: BTreeSet::new(),
        }
    }

    /// Build a profile from a validation result, without a proxy-granting ticket.
    #[must_use]
    pub fn from_validation(result: ValidationResult) -> Self {
        let mut profile = Self::new(result.principal, result.attributes);
        profile.proxies = result.proxies;
        profile
    }

    #[must_use]
    pub fn with_proxy_granting_ticket(mut self, pgt: impl Into<SecretString>) -> Self {
        self.proxy_granting_ticket = Some(pgt.into());
        self
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Principal identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.first(name)
    }

    /// Proxy-granting ticket, present only for proxy-capable clients.
    #[must_use]
    pub fn proxy_granting_ticket(&self) -> Option<&SecretString> {
        self.proxy_granting_ticket.as_ref()
    }

    #[must_use]
    pub fn proxies(&self) -> &[String] {
        &self.proxies
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }
}
