//! Route declarations.
//!
//! A [`RouteDefinition`] pairs a path template with a [`RouteTarget`] saying
//! what happens when the route matches, and a [`RouteConfig`] holding the
//! settings shared by every kind of route (name, access policy, extra query
//! variables, title and middleware).
//!
//! Definitions are immutable after construction except for
//! [`captured_args`](RouteDefinition::captured_args), which only the router
//! writes while compiling.

use std::fmt;
use std::path::PathBuf;

use serde_json::json;

use plubo_rs_auth::{AccessPolicy, BasicAuth};
use plubo_rs_core::{ArgumentMap, Resolvable};
use plubo_rs_middleware::{Middleware, MiddlewareStack};

use crate::hash;

/// The kind of a route, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// Renders a template.
    Template,
    /// Redirects elsewhere.
    Redirect,
    /// Fires an action.
    Action,
    /// Serves an existing static page under another path.
    StaticPage,
}

impl RouteKind {
    /// Returns the lowercase kind name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Redirect => "redirect",
            Self::Action => "action",
            Self::StaticPage => "static_page",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a matched route does.
#[derive(Clone)]
pub enum RouteTarget {
    /// Hands the request to a template.
    Template {
        /// Template name, or inline content when `render` is set.
        template: Resolvable<String>,
        /// Write the resolved template to a file instead of looking it up.
        render: bool,
        /// Response status.
        status: u16,
        /// Directory searched before the host's template locator.
        template_path: Option<PathBuf>,
        /// Credentials required before anything else runs.
        basic_auth: Option<BasicAuth>,
    },
    /// Redirects to another location.
    Redirect {
        /// Destination URL or site-relative path.
        destination: Resolvable<String>,
        /// Use the destination verbatim instead of joining it to the site root.
        external: bool,
        /// Requested status; anything outside 300..=308 uses the default.
        status: Option<u16>,
    },
    /// Fires a host action named by the identifier.
    Action {
        /// Action identifier.
        action: Resolvable<String>,
        /// Response status.
        status: u16,
    },
    /// Binds the path to an existing page.
    StaticPage {
        /// Page identifier.
        page_id: u64,
        /// The page's own URI.
        page_uri: String,
    },
}

impl RouteTarget {
    /// Returns the kind of this target.
    pub const fn kind(&self) -> RouteKind {
        match self {
            Self::Template { .. } => RouteKind::Template,
            Self::Redirect { .. } => RouteKind::Redirect,
            Self::Action { .. } => RouteKind::Action,
            Self::StaticPage { .. } => RouteKind::StaticPage,
        }
    }

    fn fingerprint(&self) -> serde_json::Value {
        match self {
            Self::Template {
                template,
                render,
                status,
                template_path,
                basic_auth,
            } => json!({
                "template": template.fingerprint(),
                "render": render,
                "status": status,
                "template_path": template_path,
                "basic_auth": basic_auth.as_ref().map(|a| a.users().collect::<Vec<_>>()),
            }),
            Self::Redirect {
                destination,
                external,
                status,
            } => json!({
                "destination": destination.fingerprint(),
                "external": external,
                "status": status,
            }),
            Self::Action { action, status } => json!({
                "action": action.fingerprint(),
                "status": status,
            }),
            Self::StaticPage { page_id, page_uri } => json!({
                "page_id": page_id,
                "page_uri": page_uri,
            }),
        }
    }
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTarget")
            .field("kind", &self.kind())
            .field("detail", &self.fingerprint())
            .finish()
    }
}

/// Settings shared by every kind of route.
#[derive(Clone, Default)]
pub struct RouteConfig {
    /// Explicit route name.
    pub name: Option<String>,
    /// Access rules.
    pub policy: AccessPolicy,
    /// Static query variables appended to the rewrite rule, in declaration order.
    pub extra_vars: Vec<(String, String)>,
    /// Document title for template routes.
    pub title: Option<Resolvable<String>>,
    /// Units run after basic auth and before the permission check.
    pub middleware: MiddlewareStack,
    /// Free-form settings for host integrations.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RouteConfig {
    /// Returns the value of an extra variable.
    pub fn extra_var(&self, name: &str) -> Option<&str> {
        self.extra_vars
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("extra_vars", &self.extra_vars)
            .field("title", &self.title)
            .field("middleware", &self.middleware)
            .field("extra", &self.extra)
            .finish()
    }
}

/// A declared route.
///
/// # Examples
///
/// ```
/// use plubo_rs_auth::AccessPolicy;
/// use plubo_rs_routes::{RouteDefinition, RouteKind};
///
/// let route = RouteDefinition::template("client/{client_id:number}", "client.html")
///     .name("client")
///     .extra_var("tab", "home")
///     .policy(AccessPolicy::new().guest(false));
///
/// assert_eq!(route.route_name(), "client");
/// assert_eq!(route.kind(), RouteKind::Template);
/// assert!(route.captured_args().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    path: String,
    name: String,
    config: RouteConfig,
    target: RouteTarget,
    captured_args: Vec<String>,
}

impl RouteDefinition {
    /// Declares a route. Without an explicit name the route is named by the
    /// hash of its path.
    pub fn new(path: impl Into<String>, target: RouteTarget) -> Self {
        let path = path.into();
        Self {
            name: hash::digest(&path),
            path,
            config: RouteConfig::default(),
            target,
            captured_args: Vec::new(),
        }
    }

    /// Declares a template route with status 200.
    pub fn template(path: impl Into<String>, template: impl Into<Resolvable<String>>) -> Self {
        Self::new(
            path,
            RouteTarget::Template {
                template: template.into(),
                render: false,
                status: 200,
                template_path: None,
                basic_auth: None,
            },
        )
    }

    /// Declares an internal redirect with the default status.
    pub fn redirect(path: impl Into<String>, destination: impl Into<Resolvable<String>>) -> Self {
        Self::new(
            path,
            RouteTarget::Redirect {
                destination: destination.into(),
                external: false,
                status: None,
            },
        )
    }

    /// Declares an action route with status 200.
    pub fn action(path: impl Into<String>, action: impl Into<Resolvable<String>>) -> Self {
        Self::new(
            path,
            RouteTarget::Action {
                action: action.into(),
                status: 200,
            },
        )
    }

    /// Declares a static page binding.
    pub fn static_page(path: impl Into<String>, page_id: u64, page_uri: impl Into<String>) -> Self {
        Self::new(
            path,
            RouteTarget::StaticPage {
                page_id,
                page_uri: page_uri.into(),
            },
        )
    }

    // ── Shared settings ──────────────────────────────────────────────

    /// Sets the route name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.config.name = Some(name.clone());
        self.name = name;
        self
    }

    /// Replaces the access policy.
    #[must_use]
    pub fn policy(mut self, policy: AccessPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Appends a static query variable. Re-declaring a name replaces its value.
    #[must_use]
    pub fn extra_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.config.extra_vars.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.config.extra_vars.push((name, value)),
        }
        self
    }

    /// Sets the document title.
    #[must_use]
    pub fn title(mut self, title: impl Into<Resolvable<String>>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// Appends a middleware unit.
    #[must_use]
    pub fn middleware(mut self, unit: impl Middleware + 'static) -> Self {
        self.config.middleware.add(unit);
        self
    }

    /// Stores a free-form setting.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.extra.insert(key.into(), value);
        self
    }

    // ── Target settings ──────────────────────────────────────────────

    /// Sets the response status of template and action routes, or the
    /// requested status of redirect routes.
    #[must_use]
    pub fn status(mut self, code: u16) -> Self {
        let applied = match &mut self.target {
            RouteTarget::Template { status, .. } | RouteTarget::Action { status, .. } => {
                *status = code;
                true
            }
            RouteTarget::Redirect { status, .. } => {
                *status = Some(code);
                true
            }
            RouteTarget::StaticPage { .. } => false,
        };
        self.apply_or_warn(applied, "status")
    }

    /// Writes the resolved template to a file instead of looking it up.
    #[must_use]
    pub fn render(mut self, enabled: bool) -> Self {
        let applied = match &mut self.target {
            RouteTarget::Template { render, .. } => {
                *render = enabled;
                true
            }
            _ => false,
        };
        self.apply_or_warn(applied, "render")
    }

    /// Sets the directory searched for the template first.
    #[must_use]
    pub fn template_path(mut self, dir: impl Into<PathBuf>) -> Self {
        let applied = match &mut self.target {
            RouteTarget::Template { template_path, .. } => {
                *template_path = Some(dir.into());
                true
            }
            _ => false,
        };
        self.apply_or_warn(applied, "template_path")
    }

    /// Requires HTTP basic authentication. An empty credential map disables it.
    #[must_use]
    pub fn basic_auth(mut self, auth: BasicAuth) -> Self {
        let applied = match &mut self.target {
            RouteTarget::Template { basic_auth, .. } => {
                *basic_auth = (!auth.is_empty()).then_some(auth);
                true
            }
            _ => false,
        };
        self.apply_or_warn(applied, "basic_auth")
    }

    /// Marks a redirect destination as external.
    #[must_use]
    pub fn external(mut self, enabled: bool) -> Self {
        let applied = match &mut self.target {
            RouteTarget::Redirect { external, .. } => {
                *external = enabled;
                true
            }
            _ => false,
        };
        self.apply_or_warn(applied, "external")
    }

    fn apply_or_warn(self, applied: bool, setting: &str) -> Self {
        if !applied {
            tracing::warn!(
                route = %self.name,
                kind = %self.kind(),
                setting,
                "setting does not apply to this kind of route, ignoring"
            );
        }
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Returns the raw path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the route name.
    pub fn route_name(&self) -> &str {
        &self.name
    }

    /// Returns the shared settings.
    pub const fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Returns the target.
    pub const fn target(&self) -> &RouteTarget {
        &self.target
    }

    /// Returns the route kind.
    pub const fn kind(&self) -> RouteKind {
        self.target.kind()
    }

    /// Returns the argument names recorded by the last compilation:
    /// placeholder names in order, then extra variable names.
    pub fn captured_args(&self) -> &[String] {
        &self.captured_args
    }

    pub(crate) fn set_captured_args(&mut self, args: Vec<String>) {
        self.captured_args = args;
    }

    /// Resolves the redirect status: the requested status when it lies in
    /// 300..=308, otherwise `default`. `None` for non-redirect routes.
    pub fn redirect_status(&self, default: u16) -> Option<u16> {
        match &self.target {
            RouteTarget::Redirect { status, .. } => Some(match status {
                Some(code) if (300..=308).contains(code) => *code,
                Some(code) => {
                    tracing::warn!(
                        route = %self.name,
                        status = code,
                        fallback = default,
                        "redirect status out of range"
                    );
                    default
                }
                None => default,
            }),
            _ => None,
        }
    }

    /// Resolves the document title for template routes.
    pub fn resolve_title(&self, args: &ArgumentMap) -> Option<String> {
        self.config.title.as_ref().map(|t| t.resolve(args))
    }

    /// A stable JSON description of everything that shapes the installed rules.
    pub fn fingerprint(&self) -> serde_json::Value {
        json!({
            "path": self.path,
            "name": self.name,
            "kind": self.kind().as_str(),
            "extra_vars": self.config.extra_vars,
            "target": self.target.fingerprint(),
        })
    }
}
