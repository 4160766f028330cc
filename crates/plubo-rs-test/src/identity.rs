//! Fixed identities and a stock role table for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use plubo_rs_auth::{Identity, Role, RoleRegistry};

/// An identity with fixed roles and capabilities.
///
/// Unlike [`User`](plubo_rs_auth::User), capabilities are not derived from
/// roles: `has_cap` answers from the explicit list only.
///
/// # Examples
///
/// ```
/// use plubo_rs_auth::Identity;
/// use plubo_rs_test::StaticIdentity;
///
/// let editor = StaticIdentity::member("7").with_role("editor");
/// assert!(editor.exists());
/// assert_eq!(editor.roles(), vec!["editor".to_string()]);
/// assert!(!StaticIdentity::guest().exists());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity {
    id: Option<String>,
    roles: Vec<String>,
    capabilities: Vec<String>,
}

impl StaticIdentity {
    /// An anonymous identity.
    pub fn guest() -> Self {
        Self::default()
    }

    /// An authenticated identity with no roles.
    pub fn member(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Adds a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }
}

impl Identity for StaticIdentity {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn exists(&self) -> bool {
        self.id.is_some()
    }

    fn roles(&self) -> Vec<String> {
        self.roles.clone()
    }

    fn has_cap(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// The conventional CMS roles, `subscriber` (read only) up to
/// `administrator`. Each role holds every capability of the one below it.
///
/// ```
/// use plubo_rs_auth::User;
///
/// let mut user = User::new("2", "eda");
/// plubo_rs_test::default_roles().assign(&mut user, "editor").unwrap();
/// ```
pub fn default_roles() -> RoleRegistry {
    let subscriber = ["read"];
    let contributor = [&subscriber[..], &["edit_posts", "delete_posts"]].concat();
    let author = [
        &contributor[..],
        &["publish_posts", "upload_files", "edit_published_posts", "delete_published_posts"],
    ]
    .concat();
    let editor = [
        &author[..],
        &[
            "edit_others_posts",
            "delete_others_posts",
            "edit_pages",
            "publish_pages",
            "delete_pages",
            "manage_categories",
            "moderate_comments",
        ],
    ]
    .concat();
    let administrator = [
        &editor[..],
        &[
            "manage_options",
            "list_users",
            "create_users",
            "edit_users",
            "delete_users",
            "activate_plugins",
            "edit_theme_options",
        ],
    ]
    .concat();

    let mut registry = RoleRegistry::new();
    registry.register(Role::new("subscriber").with_capabilities(&subscriber));
    registry.register(Role::new("contributor").with_capabilities(&contributor));
    registry.register(Role::new("author").with_capabilities(&author));
    registry.register(Role::new("editor").with_capabilities(&editor));
    registry.register(Role::new("administrator").with_capabilities(&administrator));
    registry
}

/// Wraps an identity and counts role and capability lookups.
///
/// Used to assert that a check never got as far as the role or capability
/// rules.
#[derive(Debug, Default)]
pub struct CountingIdentity<I> {
    inner: I,
    role_calls: AtomicUsize,
    cap_calls: AtomicUsize,
}

impl<I: Identity> CountingIdentity<I> {
    /// Wraps `inner`.
    pub const fn new(inner: I) -> Self {
        Self {
            inner,
            role_calls: AtomicUsize::new(0),
            cap_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `roles` calls so far.
    pub fn role_calls(&self) -> usize {
        self.role_calls.load(Ordering::SeqCst)
    }

    /// Number of `has_cap` calls so far.
    pub fn cap_calls(&self) -> usize {
        self.cap_calls.load(Ordering::SeqCst)
    }
}

impl<I: Identity> Identity for CountingIdentity<I> {
    fn id(&self) -> Option<&str> {
        self.inner.id()
    }

    fn exists(&self) -> bool {
        self.inner.exists()
    }

    fn roles(&self) -> Vec<String> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.roles()
    }

    fn has_cap(&self, capability: &str) -> bool {
        self.cap_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.has_cap(capability)
    }
}
