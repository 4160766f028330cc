//! The current-identity contract and request-based identity lookup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use plubo_rs_http::HttpRequest;

use crate::user::{AnonymousUser, User};

/// The host's view of the identity making the current request.
///
/// Implementations must be cheap to query: the permission checker may call
/// `roles` and `has_cap` several times per request.
pub trait Identity: Send + Sync {
    /// A stable identifier, or `None` for guests.
    fn id(&self) -> Option<&str>;

    /// Returns `true` for authenticated identities.
    fn exists(&self) -> bool;

    /// The role names held by this identity.
    fn roles(&self) -> Vec<String>;

    /// Returns `true` if this identity holds `capability`.
    fn has_cap(&self, capability: &str) -> bool;
}

impl<T: Identity + ?Sized> Identity for Arc<T> {
    fn id(&self) -> Option<&str> {
        (**self).id()
    }

    fn exists(&self) -> bool {
        (**self).exists()
    }

    fn roles(&self) -> Vec<String> {
        (**self).roles()
    }

    fn has_cap(&self, capability: &str) -> bool {
        (**self).has_cap(capability)
    }
}

/// Resolves the identity behind an API request.
pub trait IdentityProvider: Send + Sync {
    /// Returns the identity for `request`; guests get an anonymous identity.
    fn identify(&self, request: &HttpRequest) -> Arc<dyn Identity>;
}

/// An in-memory user table keyed by user id.
///
/// Looks up [`HttpRequest::user_id`], which authentication middleware (for
/// example JWT validation) sets from the token subject.
///
/// # Examples
///
/// ```
/// use plubo_rs_auth::{IdentityProvider, User, UserDirectory};
/// use plubo_rs_http::HttpRequest;
///
/// let directory = UserDirectory::new();
/// directory.insert(User::new("7", "ana"));
///
/// let request = HttpRequest::builder().user_id("7").build();
/// assert!(directory.identify(&request).exists());
/// assert!(!directory.identify(&HttpRequest::builder().build()).exists());
/// ```
#[derive(Debug, Default, Clone)]
pub struct UserDirectory {
    users: Arc<RwLock<HashMap<String, Arc<User>>>>,
}

impl UserDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: User) {
        if let Ok(mut users) = self.users.write() {
            users.insert(user.id.clone(), Arc::new(user));
        }
    }

    /// Returns a user by id.
    pub fn get(&self, id: &str) -> Option<Arc<User>> {
        self.users.read().ok()?.get(id).cloned()
    }

    /// Removes a user. Returns `true` if it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.users
            .write()
            .is_ok_and(|mut users| users.remove(id).is_some())
    }
}

impl IdentityProvider for UserDirectory {
    fn identify(&self, request: &HttpRequest) -> Arc<dyn Identity> {
        match request.user_id().and_then(|id| self.get(id)) {
            Some(user) => user as Arc<dyn Identity>,
            None => Arc::new(AnonymousUser) as Arc<dyn Identity>,
        }
    }
}
