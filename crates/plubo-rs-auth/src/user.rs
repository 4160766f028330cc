//! Concrete identities: [`User`] and [`AnonymousUser`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::roles::Role;

/// An authenticated user with roles and capabilities.
///
/// Capabilities granted through a role are copied onto the user when the
/// role is assigned, so checks never need the role registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The host's user id.
    pub id: String,
    /// The login name.
    pub username: String,
    /// Role names, in assignment order.
    pub roles: Vec<String>,
    /// Every capability the user holds, direct or through a role.
    pub capabilities: BTreeSet<String>,
    /// Superusers hold every capability.
    pub is_superuser: bool,
    /// Inactive users hold no capabilities.
    pub is_active: bool,
}

impl User {
    /// Creates an active user with no roles or capabilities.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            roles: Vec::new(),
            capabilities: BTreeSet::new(),
            is_superuser: false,
            is_active: true,
        }
    }

    /// Assigns a role and its capabilities.
    #[must_use]
    pub fn with_role(mut self, role: &Role) -> Self {
        self.assign_role(role);
        self
    }

    /// Adds a role name without granting any capabilities.
    #[must_use]
    pub fn with_role_name(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    /// Grants a single capability.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Marks the user as a superuser.
    #[must_use]
    pub const fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    /// Assigns a role and its capabilities.
    pub fn assign_role(&mut self, role: &Role) {
        if !self.roles.contains(&role.name) {
            self.roles.push(role.name.clone());
        }
        self.capabilities.extend(role.capabilities.iter().cloned());
    }

    /// Removes a role name. Capabilities already granted are kept.
    pub fn remove_role(&mut self, role: &str) {
        self.roles.retain(|r| r != role);
    }
}

impl Identity for User {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn exists(&self) -> bool {
        true
    }

    fn roles(&self) -> Vec<String> {
        self.roles.clone()
    }

    fn has_cap(&self, capability: &str) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_superuser || self.capabilities.contains(capability)
    }
}

/// The identity of a guest: no id, no roles, no capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousUser;

impl Identity for AnonymousUser {
    fn id(&self) -> Option<&str> {
        None
    }

    fn exists(&self) -> bool {
        false
    }

    fn roles(&self) -> Vec<String> {
        Vec::new()
    }

    fn has_cap(&self, _capability: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_capabilities() {
        let editor = Role::new("editor").with_capabilities(&["edit_posts", "read"]);
        let user = User::new("1", "ana").with_role(&editor).with_capability("upload_files");
        assert!(user.exists());
        assert_eq!(user.roles(), vec!["editor".to_string()]);
        assert!(user.has_cap("edit_posts"));
        assert!(user.has_cap("upload_files"));
        assert!(!user.has_cap("manage_options"));
    }

    #[test]
    fn test_superuser_has_everything() {
        let user = User::new("1", "root").superuser();
        assert!(user.has_cap("anything"));
    }

    #[test]
    fn test_inactive_user_has_nothing() {
        let mut user = User::new("1", "ana").with_capability("read").superuser();
        user.is_active = false;
        assert!(!user.has_cap("read"));
    }

    #[test]
    fn test_role_assignment_is_idempotent() {
        let role = Role::new("author");
        let mut user = User::new("1", "ana").with_role(&role);
        user.assign_role(&role);
        assert_eq!(user.roles.len(), 1);
        user.remove_role("author");
        assert!(user.roles.is_empty());
    }

    #[test]
    fn test_anonymous_user() {
        let guest = AnonymousUser;
        assert!(!guest.exists());
        assert!(guest.id().is_none());
        assert!(guest.roles().is_empty());
        assert!(!guest.has_cap("read"));
    }
}
