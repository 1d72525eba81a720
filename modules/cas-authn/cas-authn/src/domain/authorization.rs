//! Default authorization step.

use cas_authn_sdk::{AuthorizationGenerator, CasProfile, InboundRequest};

/// Attaches the configured baseline roles and permissions to every profile.
#[derive(Debug, Clone, Default)]
pub struct DefaultAuthorizationGenerator {
    roles: Vec<String>,
    permissions: Vec<String>,
}

impl DefaultAuthorizationGenerator {
    #[must_use]
    pub fn new(roles: Vec<String>, permissions: Vec<String>) -> Self {
        Self { roles, permissions }
    }
}

impl AuthorizationGenerator for DefaultAuthorizationGenerator {
    fn generate(&self, _request: &dyn InboundRequest, profile: CasProfile) -> CasProfile {
        profile
            .with_roles(self.roles.iter().cloned())
            .with_permissions(self.permissions.iter().cloned())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use cas_authn_sdk::{Attributes, ParameterMap};

    use super::*;

    #[test]
    fn attaches_baseline_roles_and_permissions() {
        let generator = DefaultAuthorizationGenerator::new(
            vec!["ROLE_USER".to_owned()],
            vec!["read".to_owned()],
        );
        let profile = generator.generate(
            &ParameterMap::new(),
            CasProfile::new("alice", Attributes::new()),
        );

        assert!(profile.roles().contains("ROLE_USER"));
        assert!(profile.permissions().contains("read"));
        assert_eq!(profile.id(), "alice");
    }

    #[test]
    fn keeps_existing_roles() {
        let generator = DefaultAuthorizationGenerator::new(vec!["ROLE_USER".to_owned()], vec![]);
        let profile = generator.generate(
            &ParameterMap::new(),
            CasProfile::new("alice", Attributes::new()).with_roles(["ROLE_ADMIN"]),
        );

        assert_eq!(profile.roles().len(), 2);
    }
}
