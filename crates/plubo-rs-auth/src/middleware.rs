//! REST-level access control as a middleware unit.

use std::sync::Arc;

use async_trait::async_trait;

use plubo_rs_core::PluboError;
use plubo_rs_http::{HttpRequest, HttpResponse, JsonResponse};
use plubo_rs_middleware::{Middleware, Next};

use crate::identity::{Identity, IdentityProvider};

/// Who may call an endpoint at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessType {
    /// Guests and members.
    #[default]
    Open,
    /// Guests only.
    Guest,
    /// Authenticated identities only.
    Registered,
}

/// Gates an endpoint on the caller's identity.
///
/// Checks run in order: access type, disallowed roles, disallowed
/// capabilities, allowed roles, allowed capabilities. A failure ends the
/// request with 403 and a `permission_denied` payload.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use plubo_rs_auth::{AccessType, PermissionsMiddleware, UserDirectory};
///
/// let users = Arc::new(UserDirectory::new());
/// let unit = PermissionsMiddleware::new(users)
///     .access_type(AccessType::Registered)
///     .disallow_roles(&["subscriber"])
///     .allow_caps(&["edit_posts"]);
/// ```
pub struct PermissionsMiddleware {
    identities: Arc<dyn IdentityProvider>,
    access_type: AccessType,
    allowed_roles: Vec<String>,
    allowed_caps: Vec<String>,
    disallowed_roles: Vec<String>,
    disallowed_caps: Vec<String>,
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

impl PermissionsMiddleware {
    /// Creates an open unit resolving identities through `identities`.
    pub fn new(identities: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identities,
            access_type: AccessType::Open,
            allowed_roles: Vec::new(),
            allowed_caps: Vec::new(),
            disallowed_roles: Vec::new(),
            disallowed_caps: Vec::new(),
        }
    }

    /// Restricts the endpoint to guests or members.
    #[must_use]
    pub const fn access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type;
        self
    }

    /// Requires at least one of these roles.
    #[must_use]
    pub fn allow_roles(mut self, roles: &[&str]) -> Self {
        self.allowed_roles = owned(roles);
        self
    }

    /// Requires at least one of these capabilities.
    #[must_use]
    pub fn allow_caps(mut self, caps: &[&str]) -> Self {
        self.allowed_caps = owned(caps);
        self
    }

    /// Rejects identities holding any of these roles.
    #[must_use]
    pub fn disallow_roles(mut self, roles: &[&str]) -> Self {
        self.disallowed_roles = owned(roles);
        self
    }

    /// Rejects identities holding any of these capabilities.
    #[must_use]
    pub fn disallow_caps(mut self, caps: &[&str]) -> Self {
        self.disallowed_caps = owned(caps);
        self
    }

    /// Returns the denial message for `identity`, or `None` if it may proceed.
    pub fn denial(&self, identity: &dyn Identity) -> Option<&'static str> {
        let is_guest = !identity.exists();
        match self.access_type {
            AccessType::Registered if is_guest => return Some("Access restricted"),
            AccessType::Guest if !is_guest => return Some("Access restricted"),
            _ => {}
        }

        let roles = identity.roles();
        if self.disallowed_roles.iter().any(|r| roles.contains(r)) {
            return Some("User role not allowed");
        }
        if self.disallowed_caps.iter().any(|c| identity.has_cap(c)) {
            return Some("User capability not allowed");
        }
        if !self.allowed_roles.is_empty() && !self.allowed_roles.iter().any(|r| roles.contains(r)) {
            return Some("User role not allowed");
        }
        if !self.allowed_caps.is_empty() && !self.allowed_caps.iter().any(|c| identity.has_cap(c)) {
            return Some("User lacks required capabilities");
        }
        None
    }
}

impl std::fmt::Debug for PermissionsMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionsMiddleware")
            .field("access_type", &self.access_type)
            .field("allowed_roles", &self.allowed_roles)
            .field("allowed_caps", &self.allowed_caps)
            .field("disallowed_roles", &self.disallowed_roles)
            .field("disallowed_caps", &self.disallowed_caps)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Middleware for PermissionsMiddleware {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> HttpResponse {
        let identity = self.identities.identify(&request);
        if let Some(message) = self.denial(identity.as_ref()) {
            tracing::debug!(message, user = ?identity.id(), "endpoint access denied");
            return JsonResponse::from_error(
                "permission_denied",
                &PluboError::PermissionDenied(message.to_string()),
            );
        }
        next.run(request).await
    }

    fn name(&self) -> &'static str {
        "permissions"
    }
}
