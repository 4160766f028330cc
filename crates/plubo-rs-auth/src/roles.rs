//! Roles as named capability bundles.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use plubo_rs_core::{PluboError, PluboResult};

use crate::user::User;

/// A named bundle of capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// The role name (e.g. `editor`).
    pub name: String,
    /// Capabilities granted by the role.
    pub capabilities: BTreeSet<String>,
}

impl Role {
    /// Creates a role with no capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: BTreeSet::new(),
        }
    }

    /// Adds capabilities, builder style.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities
            .extend(capabilities.iter().map(|c| (*c).to_string()));
        self
    }

    /// Adds one capability.
    pub fn add_capability(&mut self, capability: impl Into<String>) {
        self.capabilities.insert(capability.into());
    }

    /// Removes one capability.
    pub fn remove_capability(&mut self, capability: &str) {
        self.capabilities.remove(capability);
    }
}

/// The set of roles known to the host.
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: BTreeMap<String, Role>,
}

impl RoleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a role.
    pub fn register(&mut self, role: Role) {
        self.roles.insert(role.name.clone(), role);
    }

    /// Returns a role by name.
    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Returns the registered role names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Assigns the named role to a user.
    pub fn assign(&self, user: &mut User, name: &str) -> PluboResult<()> {
        let role = self
            .get(name)
            .ok_or_else(|| PluboError::ImproperlyConfigured(format!("unknown role '{name}'")))?;
        user.assign_role(role);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    fn registry() -> RoleRegistry {
        let mut registry = RoleRegistry::new();
        registry.register(Role::new("author").with_capabilities(&["read", "publish_posts"]));
        registry.register(Role::new("subscriber").with_capabilities(&["read"]));
        registry
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut registry = registry();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["author", "subscriber"]);
        registry.register(Role::new("subscriber"));
        assert_eq!(registry.names().count(), 2);
        assert!(registry.get("subscriber").unwrap().capabilities.is_empty());
    }

    #[test]
    fn test_assign_known_and_unknown_roles() {
        let registry = registry();
        let mut user = User::new("1", "ana");
        registry.assign(&mut user, "author").unwrap();
        assert!(user.has_cap("publish_posts"));
        assert!(matches!(
            registry.assign(&mut user, "wizard"),
            Err(PluboError::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn test_role_capability_edits() {
        let mut role = Role::new("shop_manager");
        role.add_capability("manage_orders");
        role.add_capability("read");
        role.remove_capability("read");
        assert_eq!(role.capabilities.len(), 1);
    }
}
