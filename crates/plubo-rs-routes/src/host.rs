//! Contracts between the router and the host runtime.
//!
//! The router never resolves raw request paths itself. It installs
//! [`RewriteRule`]s into a [`RewriteHost`], which later turns a request path
//! into [`QueryVars`], and it registers [`RestRoute`]s with a [`RestHost`].
//! Persistence, hooks and template lookup are reached through the remaining
//! traits. [`crate::memory`] has in-memory implementations of each.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::path::PathBuf;

use http::Method;

use plubo_rs_core::ArgumentMap;
use plubo_rs_middleware::Handler;

use crate::endpoint::PermissionPredicate;

/// Query variables produced by the host's rewrite step.
pub type QueryVars = BTreeMap<String, String>;

/// Receives rewrite tags and rules.
///
/// Rules are keyed by their pattern: installing a rule whose pattern is
/// already present replaces it.
pub trait RewriteHost {
    /// Declares a query variable and the pattern its values match.
    fn add_rewrite_tag(&mut self, tag: &str, pattern: &str);

    /// Installs a rule mapping a path pattern to query variables.
    fn add_rewrite_rule(&mut self, rule: RewriteRule);

    /// Installs a rule mapping a fixed path to a static page.
    fn add_page_rule(&mut self, rule: PageRule);

    /// Persists the installed rules.
    fn flush_rules(&mut self);
}

/// Receives REST route registrations.
pub trait RestHost {
    /// Registers one REST route.
    fn register_rest_route(&mut self, route: RestRoute);

    /// Persists the registered routes. Hosts serving registrations directly
    /// have nothing to do.
    fn flush_routes(&mut self) {}
}

/// Persistent name/value options.
pub trait OptionStore {
    /// Returns a stored option.
    fn get_option(&self, name: &str) -> Option<String>;

    /// Stores an option.
    fn update_option(&mut self, name: &str, value: &str);
}

/// Fires named host actions.
pub trait HookSink: Send + Sync {
    /// Fires `hook` with the route arguments.
    fn do_action(&self, hook: &str, args: &ArgumentMap);
}

/// Finds template files by name.
pub trait TemplateLocator: Send + Sync {
    /// Returns the path of the template called `name`, if one exists.
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

// ============================================================
// Rules
// ============================================================

/// How one query variable of a rewrite rule gets its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryBinding {
    /// Taken from a positional capture group of the rule pattern.
    Capture {
        /// Query variable name.
        name: String,
        /// 1-based group index.
        group: usize,
    },
    /// A constant value declared on the route.
    Static {
        /// Query variable name.
        name: String,
        /// The value.
        value: String,
    },
}

impl QueryBinding {
    /// Returns the query variable name.
    pub fn name(&self) -> &str {
        match self {
            Self::Capture { name, .. } | Self::Static { name, .. } => name,
        }
    }
}

/// A rewrite rule: an anchored path pattern and the query it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    /// The anchored pattern, `^...$`.
    pub pattern: String,
    /// The query variable carrying the route name.
    pub route_variable: String,
    /// The route name.
    pub route_name: String,
    /// Bindings in argument order.
    pub bindings: Vec<QueryBinding>,
}

impl RewriteRule {
    /// Renders the rule target the way front-controller rewrite tables store it.
    ///
    /// # Examples
    ///
    /// ```
    /// use plubo_rs_routes::{QueryBinding, RewriteRule};
    ///
    /// let rule = RewriteRule {
    ///     pattern: "^client/([0-9]+)$".to_string(),
    ///     route_variable: "route_name".to_string(),
    ///     route_name: "client".to_string(),
    ///     bindings: vec![
    ///         QueryBinding::Capture { name: "client_id".to_string(), group: 1 },
    ///         QueryBinding::Static { name: "tab".to_string(), value: "home".to_string() },
    ///     ],
    /// };
    /// assert_eq!(
    ///     rule.index_string("index.php"),
    ///     "index.php?route_name=client&client_id=$matches[1]&tab=home"
    /// );
    /// ```
    pub fn index_string(&self, index_base: &str) -> String {
        let mut query = format!("{index_base}?{}={}", self.route_variable, self.route_name);
        for binding in &self.bindings {
            match binding {
                QueryBinding::Capture { name, group } => {
                    write!(query, "&{name}=$matches[{group}]").ok();
                }
                QueryBinding::Static { name, value } => {
                    write!(query, "&{name}={value}").ok();
                }
            }
        }
        query
    }
}

/// A rule binding a fixed path to a static page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRule {
    /// The anchored pattern, `^...$`.
    pub pattern: String,
    /// The page identifier.
    pub page_id: u64,
    /// The page's own URI, handed to the host as `pagename`.
    pub page_uri: String,
}

impl PageRule {
    /// Renders the rule target.
    pub fn index_string(&self, index_base: &str) -> String {
        format!("{index_base}?pagename={}", self.page_uri)
    }
}

/// A REST route as registered with the host.
#[derive(Clone)]
pub struct RestRoute {
    /// The namespace, e.g. `shop/v1`.
    pub namespace: String,
    /// The unanchored named-capture pattern below the namespace.
    pub pattern: String,
    /// The accepted method.
    pub method: Method,
    /// Runs the endpoint's middleware stack and then its handler.
    pub handler: Handler,
    /// Decides whether the request may reach the handler.
    pub permission: PermissionPredicate,
}

impl fmt::Debug for RestRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestRoute")
            .field("namespace", &self.namespace)
            .field("pattern", &self.pattern)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_string_without_bindings() {
        let rule = RewriteRule {
            pattern: "^about$".to_string(),
            route_variable: "plubo_route".to_string(),
            route_name: "about".to_string(),
            bindings: Vec::new(),
        };
        assert_eq!(rule.index_string("index.php"), "index.php?plubo_route=about");
    }

    #[test]
    fn test_page_rule_index_string() {
        let rule = PageRule {
            pattern: "^welcome$".to_string(),
            page_id: 12,
            page_uri: "about/welcome".to_string(),
        };
        assert_eq!(rule.index_string("index.php"), "index.php?pagename=about/welcome");
    }

    #[test]
    fn test_binding_name() {
        let capture = QueryBinding::Capture { name: "id".to_string(), group: 2 };
        let fixed = QueryBinding::Static { name: "tab".to_string(), value: "x".to_string() };
        assert_eq!(capture.name(), "id");
        assert_eq!(fixed.name(), "tab");
    }
}
