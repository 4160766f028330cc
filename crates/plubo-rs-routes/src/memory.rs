//! In-memory host implementations.
//!
//! These back the router when no external runtime is involved (tests, small
//! embedded deployments):
//!
//! - [`RewriteTable`] applies installed rules to request paths.
//! - [`RestRegistry`] serves REST requests against registered routes.
//! - [`MemoryOptionStore`] keeps options in a map.
//! - [`NullHooks`] discards actions.
//! - [`DirectoryTemplateLocator`] finds templates under a list of directories.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use regex::Regex;

use plubo_rs_core::{ArgumentMap, PluboError};
use plubo_rs_http::urls::compiler::clean_path;
use plubo_rs_http::{HttpRequest, HttpResponse, JsonResponse};

use crate::host::{
    HookSink, OptionStore, PageRule, QueryBinding, QueryVars, RestHost, RestRoute, RewriteHost,
    RewriteRule, TemplateLocator,
};

// ============================================================
// RewriteTable
// ============================================================

#[derive(Debug, Clone)]
enum RuleTarget {
    Route(RewriteRule),
    Page(PageRule),
}

#[derive(Debug, Clone)]
struct InstalledRule {
    pattern: String,
    /// `None` when the pattern uses syntax the in-memory matcher lacks.
    regex: Option<Regex>,
    target: RuleTarget,
}

/// An ordered rewrite table.
///
/// Rules are tried in installation order and the first matching one wins.
/// Installing a rule whose pattern is already present replaces it in place.
/// A rule the `regex` crate cannot compile (lookarounds, backreferences) is
/// kept in [`RewriteTable::rules`] but never matches.
#[derive(Debug, Clone, Default)]
pub struct RewriteTable {
    tags: BTreeMap<String, String>,
    rules: Vec<InstalledRule>,
    flushes: usize,
}

impl RewriteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pattern declared for a rewrite tag such as `%client_id%`.
    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    /// Returns the installed route rules in order.
    pub fn rules(&self) -> Vec<&RewriteRule> {
        self.rules
            .iter()
            .filter_map(|r| match &r.target {
                RuleTarget::Route(rule) => Some(rule),
                RuleTarget::Page(_) => None,
            })
            .collect()
    }

    /// Returns the installed page rules in order.
    pub fn page_rules(&self) -> Vec<&PageRule> {
        self.rules
            .iter()
            .filter_map(|r| match &r.target {
                RuleTarget::Page(rule) => Some(rule),
                RuleTarget::Route(_) => None,
            })
            .collect()
    }

    /// Returns how many times the rules were flushed.
    pub const fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Resolves a request path into query variables.
    ///
    /// Returns `None` when no rule matches, which means the path is not
    /// handled by any route.
    pub fn resolve(&self, path: &str) -> Option<QueryVars> {
        let path = clean_path(path);
        self.rules.iter().find_map(|installed| {
            let captures = installed.regex.as_ref()?.captures(path)?;
            let mut vars = QueryVars::new();
            match &installed.target {
                RuleTarget::Route(rule) => {
                    vars.insert(rule.route_variable.clone(), rule.route_name.clone());
                    for binding in &rule.bindings {
                        match binding {
                            QueryBinding::Capture { name, group } => {
                                if let Some(m) = captures.get(*group) {
                                    vars.insert(name.clone(), m.as_str().to_string());
                                }
                            }
                            QueryBinding::Static { name, value } => {
                                vars.insert(name.clone(), value.clone());
                            }
                        }
                    }
                }
                RuleTarget::Page(rule) => {
                    vars.insert("pagename".to_string(), rule.page_uri.clone());
                }
            }
            tracing::trace!(path, pattern = %installed.pattern, "rewrite rule matched");
            Some(vars)
        })
    }

    fn install(&mut self, pattern: String, target: RuleTarget) {
        let regex = Regex::new(&pattern)
            .map_err(|e| {
                tracing::warn!(pattern = %pattern, error = %e, "rewrite rule cannot be matched in memory");
            })
            .ok();
        let installed = InstalledRule {
            pattern,
            regex,
            target,
        };
        match self.rules.iter_mut().find(|r| r.pattern == installed.pattern) {
            Some(slot) => *slot = installed,
            None => self.rules.push(installed),
        }
    }
}

impl RewriteHost for RewriteTable {
    fn add_rewrite_tag(&mut self, tag: &str, pattern: &str) {
        self.tags.insert(tag.to_string(), pattern.to_string());
    }

    fn add_rewrite_rule(&mut self, rule: RewriteRule) {
        self.install(rule.pattern.clone(), RuleTarget::Route(rule));
    }

    fn add_page_rule(&mut self, rule: PageRule) {
        self.install(rule.pattern.clone(), RuleTarget::Page(rule));
    }

    fn flush_rules(&mut self) {
        self.flushes += 1;
    }
}

// ============================================================
// RestRegistry
// ============================================================

/// URL prefix REST requests are served under.
pub const DEFAULT_REST_PREFIX: &str = "wp-json";

#[derive(Debug, Clone)]
struct RegisteredRoute {
    route: RestRoute,
    regex: Option<Regex>,
}

/// Serves REST requests against the registered routes.
///
/// A request path is expected as `/{prefix}/{namespace}/{route}`. Matching
/// strips the prefix and namespace, matches the remainder against each
/// route's named-capture pattern, checks the method and the permission
/// predicate, and finally calls the route handler with the named captures
/// set as URL parameters.
#[derive(Debug, Clone)]
pub struct RestRegistry {
    prefix: String,
    routes: Vec<RegisteredRoute>,
    flushes: usize,
}

impl Default for RestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RestRegistry {
    /// Creates an empty registry serving under [`DEFAULT_REST_PREFIX`].
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_REST_PREFIX)
    }

    /// Creates an empty registry serving under `prefix`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_matches('/').to_string(),
            routes: Vec::new(),
            flushes: 0,
        }
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns how many times the routes were flushed.
    pub const fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Serves one request.
    pub async fn serve(&self, mut request: HttpRequest) -> HttpResponse {
        let Some(rest) = self.strip_prefix(request.path()) else {
            return no_route();
        };
        let rest = rest.to_string();

        let mut allowed_methods = Vec::new();
        let mut found = None;
        for registered in &self.routes {
            let Some(below) = strip_segment(&rest, &registered.route.namespace) else {
                continue;
            };
            let Some(regex) = &registered.regex else {
                continue;
            };
            let Some(captures) = regex.captures(below) else {
                continue;
            };
            if registered.route.method != *request.method() {
                allowed_methods.push(registered.route.method.as_str());
                continue;
            }
            let params: BTreeMap<String, String> = regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect();
            found = Some((registered, params));
            break;
        }

        let Some((registered, params)) = found else {
            if allowed_methods.is_empty() {
                return no_route();
            }
            tracing::debug!(
                path = request.path(),
                methods = ?allowed_methods,
                "method not allowed"
            );
            return HttpResponse::not_allowed(&allowed_methods);
        };

        request.set_url_params(params);
        request.set_route(format!(
            "/{}/{}",
            registered.route.namespace, registered.route.pattern
        ));

        if !(registered.route.permission)(&request) {
            let message = "Sorry, you are not allowed to do that.".to_string();
            let error = if request.user_id().is_some() {
                PluboError::PermissionDenied(message)
            } else {
                PluboError::Unauthorized(message)
            };
            tracing::debug!(
                path = request.path(),
                status = error.status_code(),
                "permission predicate refused request"
            );
            return JsonResponse::from_error("rest_forbidden", &error);
        }

        (registered.route.handler)(request).await
    }

    fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        let path = clean_path(path);
        if self.prefix.is_empty() {
            return Some(path);
        }
        strip_segment(path, &self.prefix)
    }
}

impl RestHost for RestRegistry {
    fn register_rest_route(&mut self, route: RestRoute) {
        let anchored = format!("^{}$", route.pattern);
        let regex = Regex::new(&anchored)
            .map_err(|e| {
                tracing::warn!(pattern = %route.pattern, error = %e, "REST route cannot be matched in memory");
            })
            .ok();
        self.routes.push(RegisteredRoute { route, regex });
    }

    fn flush_routes(&mut self) {
        self.flushes += 1;
    }
}

/// Strips `segment/` (or the whole of `segment`) from the front of `path`.
fn strip_segment<'a>(path: &'a str, segment: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(segment)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

fn no_route() -> HttpResponse {
    JsonResponse::from_error(
        "rest_no_route",
        &PluboError::NotFound("No route was found matching the URL and request method.".to_string()),
    )
}

// ============================================================
// Options, hooks, templates
// ============================================================

/// Options kept in a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryOptionStore {
    options: HashMap<String, String>,
}

impl MemoryOptionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored options.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl OptionStore for MemoryOptionStore {
    fn get_option(&self, name: &str) -> Option<String> {
        self.options.get(name).cloned()
    }

    fn update_option(&mut self, name: &str, value: &str) {
        self.options.insert(name.to_string(), value.to_string());
    }
}

/// Discards every action.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHooks;

impl HookSink for NullHooks {
    fn do_action(&self, hook: &str, args: &ArgumentMap) {
        tracing::trace!(hook, args = args.len(), "action discarded");
    }
}

/// Finds templates under a list of directories, searched in order.
#[derive(Debug, Clone, Default)]
pub struct DirectoryTemplateLocator {
    roots: Vec<PathBuf>,
}

impl DirectoryTemplateLocator {
    /// Creates a locator over `roots`.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }
}

impl TemplateLocator for DirectoryTemplateLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        let name = name.trim_start_matches('/');
        if name.is_empty() || name.split('/').any(|part| part == "..") {
            return None;
        }
        self.roots
            .iter()
            .map(|root| root.join(name))
            .find(|candidate| candidate.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use http::StatusCode;
    use plubo_rs_middleware::handler;

    fn rule(pattern: &str, name: &str, bindings: Vec<QueryBinding>) -> RewriteRule {
        RewriteRule {
            pattern: pattern.to_string(),
            route_variable: "route_name".to_string(),
            route_name: name.to_string(),
            bindings,
        }
    }

    fn rest_route(pattern: &str, method: http::Method, body: &'static str) -> RestRoute {
        RestRoute {
            namespace: "shop/v1".to_string(),
            pattern: pattern.to_string(),
            method,
            handler: handler(move |req: HttpRequest| async move {
                let id = req.url_param("id").unwrap_or("-").to_string();
                HttpResponse::ok(format!("{body}:{id}"))
            }),
            permission: Arc::new(|_: &HttpRequest| true),
        }
    }

    #[test]
    fn test_rewrite_table_resolves_bindings() {
        let mut table = RewriteTable::new();
        table.add_rewrite_rule(rule(
            "^client/([0-9]+)$",
            "client",
            vec![
                QueryBinding::Capture { name: "client_id".to_string(), group: 1 },
                QueryBinding::Static { name: "tab".to_string(), value: "home".to_string() },
            ],
        ));

        let vars = table.resolve("/client/42/").unwrap();
        assert_eq!(vars.get("route_name").map(String::as_str), Some("client"));
        assert_eq!(vars.get("client_id").map(String::as_str), Some("42"));
        assert_eq!(vars.get("tab").map(String::as_str), Some("home"));
        assert!(table.resolve("client/abc").is_none());
    }

    #[test]
    fn test_rewrite_table_replaces_same_pattern() {
        let mut table = RewriteTable::new();
        table.add_rewrite_rule(rule("^a$", "first", Vec::new()));
        table.add_rewrite_rule(rule("^b$", "other", Vec::new()));
        table.add_rewrite_rule(rule("^a$", "second", Vec::new()));

        assert_eq!(table.rules().len(), 2);
        assert_eq!(table.rules()[0].route_name, "second");
    }

    #[test]
    fn test_rewrite_table_first_rule_wins() {
        let mut table = RewriteTable::new();
        table.add_rewrite_rule(rule("^items/(.+)$", "catch_all", Vec::new()));
        table.add_rewrite_rule(rule("^items/new$", "new_item", Vec::new()));

        let vars = table.resolve("items/new").unwrap();
        assert_eq!(vars.get("route_name").map(String::as_str), Some("catch_all"));
    }

    #[test]
    fn test_rewrite_table_keeps_unmatchable_pattern() {
        let mut table = RewriteTable::new();
        table.add_rewrite_rule(rule("^a/((?!admin)[a-z]+)$", "lookahead", Vec::new()));
        table.add_rewrite_rule(rule("^a/(.+)$", "fallback", Vec::new()));
        assert_eq!(table.rules().len(), 2);

        let vars = table.resolve("a/editor").unwrap();
        assert_eq!(vars.get("route_name").map(String::as_str), Some("fallback"));
    }

    #[tokio::test]
    async fn test_rest_registry_serves_named_captures() {
        let mut registry = RestRegistry::new();
        registry.register_rest_route(rest_route("orders/(?P<id>[0-9]+)", http::Method::GET, "order"));

        let request = HttpRequest::builder()
            .method(http::Method::GET)
            .path("/wp-json/shop/v1/orders/42")
            .build();
        let response = registry.serve(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text(), "order:42");
    }

    #[tokio::test]
    async fn test_rest_registry_not_found_and_method() {
        let mut registry = RestRegistry::new();
        registry.register_rest_route(rest_route("orders/(?P<id>[0-9]+)", http::Method::GET, "order"));

        let missing = HttpRequest::builder().path("/wp-json/shop/v1/customers/1").build();
        let response = registry.serve(missing).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.json().unwrap()["code"], "rest_no_route");

        let wrong_method = HttpRequest::builder()
            .method(http::Method::DELETE)
            .path("/wp-json/shop/v1/orders/1")
            .build();
        let response = registry.serve(wrong_method).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header("allow"), Some("GET"));
    }

    #[tokio::test]
    async fn test_rest_registry_keeps_unmatchable_route() {
        let mut registry = RestRegistry::new();
        registry.register_rest_route(rest_route(
            "users/(?P<slug>(?!admin)[a-z]+)",
            http::Method::GET,
            "user",
        ));
        assert_eq!(registry.len(), 1);

        let request = HttpRequest::builder().path("/wp-json/shop/v1/users/editor").build();
        let response = registry.serve(request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rest_registry_permission_statuses() {
        let mut registry = RestRegistry::new();
        let mut route = rest_route("secret", http::Method::GET, "secret");
        route.permission = Arc::new(|req: &HttpRequest| req.header("x-key") == Some("open"));
        registry.register_rest_route(route);

        let guest = HttpRequest::builder().path("/wp-json/shop/v1/secret").build();
        assert_eq!(registry.serve(guest).await.status(), StatusCode::UNAUTHORIZED);

        let member = HttpRequest::builder()
            .path("/wp-json/shop/v1/secret")
            .user_id("9")
            .build();
        let response = registry.serve(member).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.json().unwrap()["code"], "rest_forbidden");

        let allowed = HttpRequest::builder()
            .path("/wp-json/shop/v1/secret")
            .header("x-key", "open")
            .build();
        assert_eq!(registry.serve(allowed).await.status(), StatusCode::OK);
    }

    #[test]
    fn test_strip_segment() {
        assert_eq!(strip_segment("wp-json/shop/v1", "wp-json"), Some("shop/v1"));
        assert_eq!(strip_segment("wp-json", "wp-json"), Some(""));
        assert_eq!(strip_segment("wp-jsonx/a", "wp-json"), None);
    }

    #[test]
    fn test_option_store() {
        let mut options = MemoryOptionStore::new();
        assert!(options.get_option("hash").is_none());
        options.update_option("hash", "abc");
        assert_eq!(options.get_option("hash").as_deref(), Some("abc"));
        assert_eq!(options.len(), 1);
    }

    #[test]
    fn test_directory_locator() {
        let root = std::env::temp_dir().join(format!("plubo-locator-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("client.html"), "<p>client</p>").unwrap();

        let locator = DirectoryTemplateLocator::new([PathBuf::from("/nonexistent"), root.clone()]);
        assert_eq!(locator.locate("client.html"), Some(root.join("client.html")));
        assert_eq!(locator.locate("missing.html"), None);
        assert_eq!(locator.locate("../etc/passwd"), None);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
