//! Inbound request abstraction.
//!
//! The client only ever needs a named-parameter lookup. Headers, the
//! request-target and the body are never consulted.

use std::collections::HashMap;

use url::form_urlencoded;

/// Read-only view of the caller's request.
pub trait InboundRequest: Send + Sync {
    /// Value of the query parameter `name`, percent-decoded.
    fn parameter(&self, name: &str) -> Option<String>;
}

impl<B> InboundRequest for http::Request<B>
where
    B: Send + Sync,
{
    fn parameter(&self, name: &str) -> Option<String> {
        let query = self.uri().query()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// Plain parameter map, for callers that do not speak `http`.
#[derive(Debug, Clone, Default)]
pub struct ParameterMap {
    params: HashMap<String, String>,
}

impl ParameterMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

impl InboundRequest for ParameterMap {
    fn parameter(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }
}
