//! The route access-control decision.
//!
//! [`PermissionChecker::check`] is a pure function of the route's
//! [`AccessPolicy`], the resolved argument map, the current [`Identity`] and
//! the configured [`AccessMode`]. Steps run in a fixed order and the first
//! failing step decides:
//!
//! 1. The custom predicate, if configured.
//! 2. Guest/member gating (`guest` / `logged_in`), when the access mode applies it.
//! 3. The role allow-list, if non-empty: the identity needs at least one listed role.
//! 4. The capability allow-list, if non-empty: the identity needs at least one listed capability.
//!
//! A denial becomes a [`ForbiddenAction`]: a redirect when the policy names a
//! redirect target, otherwise a bare status.

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use plubo_rs_core::{AccessMode, ArgumentMap, Resolvable, Settings};

use crate::identity::Identity;

/// A custom access predicate over the route arguments.
pub type AccessPredicate = Arc<dyn Fn(&ArgumentMap) -> bool + Send + Sync>;

/// Declarative access rules attached to a route.
///
/// # Examples
///
/// ```
/// use plubo_rs_auth::AccessPolicy;
///
/// let policy = AccessPolicy::new()
///     .guest(false)
///     .allowed_roles(["editor", "administrator"])
///     .redirect("/login");
/// assert!(!policy.guest);
/// ```
#[derive(Clone)]
pub struct AccessPolicy {
    /// Whether anonymous identities may access the route.
    pub guest: bool,
    /// Whether authenticated identities may access the route.
    pub logged_in: bool,
    /// Marks the route private; gating then applies under [`AccessMode::PrivateOnly`].
    pub private: bool,
    /// Where to send denied requests, if anywhere.
    pub redirect: Option<Resolvable<String>>,
    /// Status for denied requests (a 3xx with a redirect, otherwise 4xx/5xx).
    pub forbidden_status: Option<u16>,
    /// Roles allowed to access the route; empty means unrestricted.
    pub allowed_roles: Resolvable<Vec<String>>,
    /// Capabilities allowed to access the route; empty means unrestricted.
    pub allowed_caps: Resolvable<Vec<String>>,
    /// Custom predicate, evaluated before every other rule.
    pub permission_callback: Option<AccessPredicate>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            guest: true,
            logged_in: true,
            private: false,
            redirect: None,
            forbidden_status: None,
            allowed_roles: Resolvable::Literal(Vec::new()),
            allowed_caps: Resolvable::Literal(Vec::new()),
            permission_callback: None,
        }
    }
}

impl AccessPolicy {
    /// Creates a policy that allows everyone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets guest access.
    #[must_use]
    pub const fn guest(mut self, allowed: bool) -> Self {
        self.guest = allowed;
        self
    }

    /// Sets member access.
    #[must_use]
    pub const fn logged_in(mut self, allowed: bool) -> Self {
        self.logged_in = allowed;
        self
    }

    /// Flags the route private.
    #[must_use]
    pub const fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Redirects denied requests to `target`.
    #[must_use]
    pub fn redirect(mut self, target: impl Into<Resolvable<String>>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    /// Sets the status used for denied requests.
    #[must_use]
    pub const fn forbidden_status(mut self, status: u16) -> Self {
        self.forbidden_status = Some(status);
        self
    }

    /// Sets the role allow-list (a literal list or a resolver).
    #[must_use]
    pub fn allowed_roles(mut self, roles: impl Into<Resolvable<Vec<String>>>) -> Self {
        self.allowed_roles = roles.into();
        self
    }

    /// Sets the capability allow-list (a literal list or a resolver).
    #[must_use]
    pub fn allowed_caps(mut self, caps: impl Into<Resolvable<Vec<String>>>) -> Self {
        self.allowed_caps = caps.into();
        self
    }

    /// Sets the custom predicate.
    #[must_use]
    pub fn permission_callback<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ArgumentMap) -> bool + Send + Sync + 'static,
    {
        self.permission_callback = Some(Arc::new(predicate));
        self
    }

    /// Returns `true` if no rule can deny access.
    pub fn is_open(&self) -> bool {
        self.guest
            && self.logged_in
            && self.permission_callback.is_none()
            && self.allowed_roles.as_literal().is_some_and(Vec::is_empty)
            && self.allowed_caps.as_literal().is_some_and(Vec::is_empty)
    }

    /// A stable JSON description used for change detection.
    pub fn fingerprint(&self) -> serde_json::Value {
        json!({
            "guest": self.guest,
            "logged_in": self.logged_in,
            "private": self.private,
            "redirect": self.redirect.as_ref().map(Resolvable::fingerprint),
            "forbidden_status": self.forbidden_status,
            "allowed_roles": self.allowed_roles.fingerprint(),
            "allowed_caps": self.allowed_caps.fingerprint(),
            "permission_callback": self.permission_callback.is_some(),
        })
    }
}

impl fmt::Debug for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPolicy")
            .field("guest", &self.guest)
            .field("logged_in", &self.logged_in)
            .field("private", &self.private)
            .field("redirect", &self.redirect)
            .field("forbidden_status", &self.forbidden_status)
            .field("allowed_roles", &self.allowed_roles)
            .field("allowed_caps", &self.allowed_caps)
            .field("permission_callback", &self.permission_callback.is_some())
            .finish()
    }
}

/// What happens to a denied request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForbiddenAction {
    /// Redirect to `location` with a 3xx status.
    Redirect {
        /// Redirect target.
        location: String,
        /// Status in 300..=308.
        status: u16,
    },
    /// Emit a bare status with no content.
    Status(u16),
}

/// The outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access granted.
    Allowed,
    /// Access denied; the request ends with the given action.
    Forbidden(ForbiddenAction),
}

impl AccessDecision {
    /// Returns `true` for [`AccessDecision::Allowed`].
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Evaluates [`AccessPolicy`] rules for the current identity.
#[derive(Debug, Clone, Copy)]
pub struct PermissionChecker {
    mode: AccessMode,
    default_forbidden_status: u16,
    default_redirect_status: u16,
}

impl Default for PermissionChecker {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PermissionChecker {
    /// Creates a checker with default statuses and the given mode.
    pub fn new(mode: AccessMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Creates a checker from the router settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            mode: settings.access_mode,
            default_forbidden_status: clamp_status(
                settings.default_forbidden_status,
                400..=599,
                403,
            ),
            default_redirect_status: clamp_status(
                settings.default_forbidden_redirect_status,
                300..=308,
                302,
            ),
        }
    }

    /// Returns the access mode.
    pub const fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Decides whether `identity` may access a route guarded by `policy`.
    pub fn check(
        &self,
        policy: &AccessPolicy,
        args: &ArgumentMap,
        identity: &dyn Identity,
    ) -> AccessDecision {
        match self.first_failure(policy, args, identity) {
            None => AccessDecision::Allowed,
            Some(reason) => {
                tracing::debug!(reason, identity = ?identity.id(), "access denied");
                AccessDecision::Forbidden(self.forbidden_action(policy, args))
            }
        }
    }

    fn first_failure(
        &self,
        policy: &AccessPolicy,
        args: &ArgumentMap,
        identity: &dyn Identity,
    ) -> Option<&'static str> {
        if let Some(predicate) = &policy.permission_callback {
            if !predicate(args) {
                return Some("permission callback");
            }
        }

        if self.gating_applies(policy) {
            let member = identity.exists();
            if (!member && !policy.guest) || (member && !policy.logged_in) {
                return Some(if member { "members not allowed" } else { "guests not allowed" });
            }
        }

        let roles = policy.allowed_roles.resolve(args);
        if !roles.is_empty() {
            let held = identity.roles();
            if !roles.iter().any(|r| held.contains(r)) {
                return Some("role not allowed");
            }
        }

        let caps = policy.allowed_caps.resolve(args);
        if !caps.is_empty() && !caps.iter().any(|c| identity.has_cap(c)) {
            return Some("missing capability");
        }

        None
    }

    const fn gating_applies(&self, policy: &AccessPolicy) -> bool {
        match self.mode {
            AccessMode::Public => false,
            AccessMode::PrivateOnly => policy.private,
            AccessMode::GuestAndMemberRules => true,
        }
    }

    /// Builds the action taken for a denied request under `policy`.
    pub fn forbidden_action(&self, policy: &AccessPolicy, args: &ArgumentMap) -> ForbiddenAction {
        match &policy.redirect {
            Some(target) => ForbiddenAction::Redirect {
                location: target.resolve(args),
                status: policy.forbidden_status.map_or(self.default_redirect_status, |s| {
                    clamp_status(s, 300..=308, self.default_redirect_status)
                }),
            },
            None => ForbiddenAction::Status(policy.forbidden_status.map_or(
                self.default_forbidden_status,
                |s| clamp_status(s, 400..=599, self.default_forbidden_status),
            )),
        }
    }
}

fn clamp_status(status: u16, range: std::ops::RangeInclusive<u16>, fallback: u16) -> u16 {
    if range.contains(&status) {
        status
    } else {
        tracing::warn!(status, fallback, "status out of range, using fallback");
        fallback
    }
}
