//! Data-driven attribute schemas.
//!
//! Identity providers differ only in which attributes they release and how
//! those should be typed, so a provider is described by a table of
//! `(name, kind)` rows instead of a dedicated profile type.

use url::Url;

use crate::models::CasProfile;

/// Expected type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    /// All values of a multi-valued attribute.
    Strings,
    Integer,
    Boolean,
    Url,
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedAttribute {
    String(String),
    Strings(Vec<String>),
    Integer(i64),
    Boolean(bool),
    Url(Url),
}

/// Attribute conversion errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("attribute '{0}' is not declared in schema '{1}'")]
    Undeclared(String, String),

    #[error("attribute '{name}' cannot be read as {kind:?}: '{value}'")]
    Conversion {
        name: String,
        kind: AttributeKind,
        value: String,
    },
}

/// Named set of typed attribute definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSchema {
    name: String,
    fields: Vec<(String, AttributeKind)>,
}

impl AttributeSchema {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        self.fields.push((name.into(), kind));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<AttributeKind> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, k)| *k)
    }

    /// Read attribute `name` from `profile` converted to its declared kind.
    ///
    /// Returns `Ok(None)` when the profile does not carry the attribute.
    ///
    /// # Errors
    ///
    /// - `Undeclared` if `name` is not part of this schema
    /// - `Conversion` if the value does not parse as the declared kind
    pub fn read(
        &self,
        profile: &CasProfile,
        name: &str,
    ) -> Result<Option<TypedAttribute>, AttributeError> {
        let kind = self
            .kind_of(name)
            .ok_or_else(|| AttributeError::Undeclared(name.to_owned(), self.name.clone()))?;

        let Some(values) = profile.attributes().get(name) else {
            return Ok(None);
        };
        let Some(first) = values.first() else {
            return Ok(None);
        };

        let conversion = |value: &str| AttributeError::Conversion {
            name: name.to_owned(),
            kind,
            value: value.to_owned(),
        };

        let typed = match kind {
            AttributeKind::String => TypedAttribute::String(first.clone()),
            AttributeKind::Strings => TypedAttribute::Strings(values.to_vec()),
            AttributeKind::Integer => TypedAttribute::Integer(
                first.trim().parse().map_err(|_| conversion(first))?,
            ),
            AttributeKind::Boolean => match first.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => TypedAttribute::Boolean(true),
                "false" | "0" | "no" => TypedAttribute::Boolean(false),
                _ => return Err(conversion(first)),
            },
            AttributeKind::Url => {
                TypedAttribute::Url(Url::parse(first.trim()).map_err(|_| conversion(first))?)
            }
        };

        Ok(Some(typed))
    }
}

impl CasProfile {
    /// Shorthand for [`AttributeSchema::read`].
    ///
    /// # Errors
    ///
    /// See [`AttributeSchema::read`].
    pub fn typed_attribute(
        &self,
        schema: &AttributeSchema,
        name: &str,
    ) -> Result<Option<TypedAttribute>, AttributeError> {
        schema.read(self, name)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::models::Attributes;

    fn github_like() -> AttributeSchema {
        AttributeSchema::new("github")
            .field("name", AttributeKind::String)
            .field("followers", AttributeKind::Integer)
            .field("hireable", AttributeKind::Boolean)
            .field("blog", AttributeKind::Url)
            .field("orgs", AttributeKind::Strings)
    }

    fn profile() -> CasProfile {
        let attrs: Attributes = [
            ("name", "Alice"),
            ("followers", "42"),
            ("hireable", "true"),
            ("blog", "https://alice.example.org/"),
            ("orgs", "acme"),
            ("orgs", "initech"),
        ]
        .into_iter()
        .collect();
        CasProfile::new("alice", attrs)
    }

    #[test]
    fn reads_declared_kinds() {
        let schema = github_like();
        let p = profile();

        assert_eq!(
            p.typed_attribute(&schema, "name").unwrap(),
            Some(TypedAttribute::String("Alice".to_owned()))
        );
        assert_eq!(
            p.typed_attribute(&schema, "followers").unwrap(),
            Some(TypedAttribute::Integer(42))
        );
        assert_eq!(
            p.typed_attribute(&schema, "hireable").unwrap(),
            Some(TypedAttribute::Boolean(true))
        );
        assert_eq!(
            p.typed_attribute(&schema, "orgs").unwrap(),
            Some(TypedAttribute::Strings(vec![
                "acme".to_owned(),
                "initech".to_owned()
            ]))
        );
        assert!(matches!(
            p.typed_attribute(&schema, "blog").unwrap(),
            Some(TypedAttribute::Url(u)) if u.host_str() == Some("alice.example.org")
        ));
    }

    #[test]
    fn absent_attribute_is_none() {
        let schema = github_like().field("company", AttributeKind::String);
        assert_eq!(profile().typed_attribute(&schema, "company").unwrap(), None);
    }

    #[test]
    fn undeclared_attribute_is_rejected() {
        let err = profile()
            .typed_attribute(&github_like(), "email")
            .unwrap_err();
        assert!(matches!(err, AttributeError::Undeclared(name, _) if name == "email"));
    }

    #[test]
    fn bad_integer_is_a_conversion_error() {
        let schema = AttributeSchema::new("s").field("name", AttributeKind::Integer);
        let err = profile().typed_attribute(&schema, "name").unwrap_err();
        assert!(matches!(err, AttributeError::Conversion { kind: AttributeKind::Integer, .. }));
    }
}
