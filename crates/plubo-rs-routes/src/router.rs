//! The route and endpoint registry.
//!
//! Registration is append-only and registration order is match order.
//! [`Router::compile_routes`] turns every route into host rewrite rules and
//! records the argument names each route captures;
//! [`Router::compile_endpoints`] registers REST routes. Both compare a content
//! hash of the declared set with the one stored by the previous run and only
//! flush the host's rules when it changed.
//!
//! Lookup ([`Router::match_request`]) is by route name, taken from the query
//! variable the rewrite rules set. Names should be unique; when they are not,
//! the first registered route shadows the later ones.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use plubo_rs_core::{PluboError, Settings, SETTINGS};
use plubo_rs_http::urls::compiler::{self, CompileMode};
use plubo_rs_http::HttpRequest;
use plubo_rs_middleware::handler;

use crate::endpoint::Endpoint;
use crate::hash;
use crate::host::{
    OptionStore, PageRule, QueryBinding, QueryVars, RestHost, RestRoute, RewriteHost, RewriteRule,
};
use crate::route::{RouteDefinition, RouteTarget};

/// Pattern of the rewrite tag carrying the route name.
const ROUTE_VARIABLE_TAG: &str = "(.+)";
/// Pattern of rewrite tags declared for extra variables.
const EXTRA_VAR_TAG: &str = "([a-z0-9-]+)";

/// Why a request could not be matched to a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The query variables do not name a route: the request is not ours.
    #[error("missing route variable")]
    MissingRouteVariable,
    /// The query variables name a route that is not registered.
    #[error("route not found: {0}")]
    RouteNotFound(String),
}

impl From<MatchError> for PluboError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::MissingRouteVariable => Self::BadRequest(e.to_string()),
            MatchError::RouteNotFound(_) => Self::NotFound("Route Not Found".to_string()),
        }
    }
}

/// What a compilation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    /// Anchored patterns installed, in registration order.
    pub rules: Vec<String>,
    /// Content hash of the declared set.
    pub hash: String,
    /// Whether the host's rules were flushed because the hash changed.
    pub flushed: bool,
}

/// The route and endpoint registry.
///
/// # Examples
///
/// ```
/// use plubo_rs_routes::{MemoryOptionStore, RewriteTable, RouteDefinition, Router};
///
/// let mut router = Router::new();
/// router.add_route(RouteDefinition::template("client/{client_id:number}", "client.html").name("client"));
///
/// let mut table = RewriteTable::new();
/// let mut options = MemoryOptionStore::new();
/// let report = router.compile_routes(&mut table, &mut options);
/// assert!(report.flushed);
///
/// let vars = table.resolve("/client/42").unwrap();
/// let route = router.match_request(&vars).unwrap();
/// assert_eq!(route.captured_args(), ["client_id"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Router {
    settings: Settings,
    routes: Vec<RouteDefinition>,
    endpoints: Vec<Arc<Endpoint>>,
}

impl Router {
    /// Creates an empty router using the process-wide [`SETTINGS`], which
    /// are the defaults unless the host configured them at startup.
    pub fn new() -> Self {
        Self::with_settings(SETTINGS.get_or_default().clone())
    }

    /// Creates an empty router with the given settings.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Returns the router settings.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the query variable carrying the route name.
    pub fn route_variable(&self) -> &str {
        &self.settings.route_variable
    }

    /// Registers a route.
    pub fn add_route(&mut self, route: RouteDefinition) {
        if self.route(route.route_name()).is_some() {
            tracing::debug!(
                route = route.route_name(),
                path = route.path(),
                "route name already registered, the earlier route shadows this one"
            );
        }
        self.routes.push(route);
    }

    /// Registers an endpoint.
    pub fn add_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoints.push(Arc::new(endpoint));
    }

    /// Hands the declared routes to `filter`, which may add, drop or reorder
    /// them. Extensions use this to adjust another module's declarations
    /// before compilation.
    pub fn filter_routes(&mut self, filter: impl FnOnce(&mut Vec<RouteDefinition>)) {
        let before = self.routes.len();
        filter(&mut self.routes);
        tracing::debug!(before, after = self.routes.len(), "routes filtered");
    }

    /// Hands the declared endpoints to `filter`.
    pub fn filter_endpoints(&mut self, filter: impl FnOnce(&mut Vec<Arc<Endpoint>>)) {
        let before = self.endpoints.len();
        filter(&mut self.endpoints);
        tracing::debug!(before, after = self.endpoints.len(), "endpoints filtered");
    }

    /// Returns the registered routes in registration order.
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    /// Returns the registered endpoints in registration order.
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    /// Returns the first route registered under `name`.
    pub fn route(&self, name: &str) -> Option<&RouteDefinition> {
        self.routes.iter().find(|r| r.route_name() == name)
    }

    /// Content hash of the declared routes.
    pub fn routes_hash(&self) -> String {
        hash::content_hash(&Value::Array(
            self.routes.iter().map(RouteDefinition::fingerprint).collect(),
        ))
    }

    /// Content hash of the declared endpoints.
    pub fn endpoints_hash(&self) -> String {
        hash::content_hash(&Value::Array(
            self.endpoints.iter().map(|e| e.fingerprint()).collect(),
        ))
    }

    // ============================================================
    // Compilation
    // ============================================================

    /// Installs every route into the host's rewrite table.
    ///
    /// Placeholders become positional capture groups bound to query variables
    /// of the same name; extra variables are appended as constants. Each
    /// route's [`captured_args`](RouteDefinition::captured_args) is rebuilt
    /// from scratch, so compiling twice yields the same list. Static page
    /// routes install a page rule instead.
    ///
    /// The rules are flushed, and the new hash stored, only when the hash
    /// differs from the stored one.
    pub fn compile_routes(
        &mut self,
        host: &mut dyn RewriteHost,
        options: &mut dyn OptionStore,
    ) -> CompileReport {
        let mut report = CompileReport::default();
        let route_variable = self.settings.route_variable.clone();
        host.add_rewrite_tag(&tag(&route_variable), ROUTE_VARIABLE_TAG);

        let mut seen = HashSet::new();
        for route in &mut self.routes {
            if !seen.insert(route.route_name().to_string()) {
                tracing::debug!(route = route.route_name(), "duplicate route name");
            }

            let compiled = compiler::compile(route.path(), CompileMode::Rewrite);
            let pattern = compiled.anchored();

            if let RouteTarget::StaticPage { page_id, page_uri } = route.target() {
                host.add_page_rule(PageRule {
                    pattern: pattern.clone(),
                    page_id: *page_id,
                    page_uri: page_uri.clone(),
                });
                route.set_captured_args(Vec::new());
                report.rules.push(pattern);
                continue;
            }

            let mut args = Vec::new();
            let mut bindings = Vec::new();
            for placeholder in compiled.placeholders() {
                let group = placeholder.group_index.unwrap_or_default();
                host.add_rewrite_tag(&tag(&placeholder.name), &format!("({})", placeholder.fragment));
                bindings.push(QueryBinding::Capture {
                    name: placeholder.name.clone(),
                    group,
                });
                args.push(placeholder.name.clone());
            }
            for (name, value) in &route.config().extra_vars {
                host.add_rewrite_tag(&tag(name), EXTRA_VAR_TAG);
                bindings.push(QueryBinding::Static {
                    name: name.clone(),
                    value: value.clone(),
                });
                args.push(name.clone());
            }

            tracing::debug!(
                route = route.route_name(),
                pattern = %pattern,
                args = ?args,
                "compiled route"
            );
            route.set_captured_args(args);
            host.add_rewrite_rule(RewriteRule {
                pattern: pattern.clone(),
                route_variable: route_variable.clone(),
                route_name: route.route_name().to_string(),
                bindings,
            });
            report.rules.push(pattern);
        }

        report.hash = self.routes_hash();
        let option = &self.settings.routes_hash_option;
        report.flushed = flush_if_changed(options, option, &report.hash, || host.flush_rules());
        report
    }

    /// Registers every endpoint with the host's REST registry.
    ///
    /// Each registered handler runs the endpoint's middleware stack before
    /// the endpoint handler.
    pub fn compile_endpoints(
        &self,
        host: &mut dyn RestHost,
        options: &mut dyn OptionStore,
    ) -> CompileReport {
        let mut report = CompileReport::default();

        for endpoint in &self.endpoints {
            let compiled = compiler::compile(endpoint.path(), CompileMode::NamedCapture);
            let wrapped = Arc::clone(endpoint);
            let route = RestRoute {
                namespace: endpoint.namespace().to_string(),
                pattern: compiled.pattern().to_string(),
                method: endpoint.method().clone(),
                handler: handler(move |request: HttpRequest| {
                    let endpoint = Arc::clone(&wrapped);
                    async move { endpoint.dispatch(request).await }
                }),
                permission: endpoint.permission_predicate(),
            };
            tracing::debug!(
                namespace = %route.namespace,
                pattern = %route.pattern,
                method = %route.method,
                "registered endpoint"
            );
            report.rules.push(format!("{}/{}", route.namespace, route.pattern));
            host.register_rest_route(route);
        }

        report.hash = self.endpoints_hash();
        let option = &self.settings.endpoints_hash_option;
        report.flushed = flush_if_changed(options, option, &report.hash, || host.flush_routes());
        report
    }

    // ============================================================
    // Lookup
    // ============================================================

    /// Finds the route named by the route variable.
    ///
    /// # Errors
    ///
    /// [`MatchError::MissingRouteVariable`] when the variable is absent or
    /// empty, [`MatchError::RouteNotFound`] when no route has that name.
    pub fn match_request(&self, query_vars: &QueryVars) -> Result<&RouteDefinition, MatchError> {
        let name = query_vars
            .get(self.route_variable())
            .filter(|v| !v.is_empty())
            .ok_or(MatchError::MissingRouteVariable)?;

        self.route(name).ok_or_else(|| {
            tracing::debug!(route = %name, "no route registered under this name");
            MatchError::RouteNotFound(name.clone())
        })
    }

    /// Returns the public link of a static page bound by a route.
    pub fn page_link(&self, page_id: u64) -> Option<String> {
        self.routes.iter().find_map(|route| match route.target() {
            RouteTarget::StaticPage { page_id: id, .. } if *id == page_id => {
                Some(self.home_url(compiler::clean_path(route.path())))
            }
            _ => None,
        })
    }

    /// Joins a site-relative path to the configured home URL.
    pub fn home_url(&self, path: &str) -> String {
        let base = self.settings.home_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if base.is_empty() {
            format!("/{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

fn tag(name: &str) -> String {
    format!("%{name}%")
}

fn flush_if_changed(
    options: &mut dyn OptionStore,
    option: &str,
    hash: &str,
    flush: impl FnOnce(),
) -> bool {
    if options.get_option(option).as_deref() == Some(hash) {
        tracing::debug!(option, "declarations unchanged, keeping installed rules");
        return false;
    }
    flush();
    options.update_option(option, hash);
    tracing::info!(option, hash, "declarations changed, rules flushed");
    true
}
