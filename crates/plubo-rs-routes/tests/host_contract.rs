//! The router against a host that only records what it is told.

use plubo_rs_http::HttpResponse;
use plubo_rs_routes::{
    Endpoint, MemoryOptionStore, OptionStore, PageRule, QueryBinding, RestHost, RestRoute,
    RewriteHost, RewriteRule, RouteDefinition, Router,
};

#[derive(Default)]
struct RecordingHost {
    tags: Vec<(String, String)>,
    rules: Vec<RewriteRule>,
    pages: Vec<PageRule>,
    rest: Vec<RestRoute>,
    flushes: usize,
}

impl RewriteHost for RecordingHost {
    fn add_rewrite_tag(&mut self, tag: &str, pattern: &str) {
        self.tags.push((tag.to_string(), pattern.to_string()));
    }

    fn add_rewrite_rule(&mut self, rule: RewriteRule) {
        self.rules.push(rule);
    }

    fn add_page_rule(&mut self, rule: PageRule) {
        self.pages.push(rule);
    }

    fn flush_rules(&mut self) {
        self.flushes += 1;
    }
}

impl RestHost for RecordingHost {
    fn register_rest_route(&mut self, route: RestRoute) {
        self.rest.push(route);
    }
}

fn router() -> Router {
    let mut router = Router::new();
    router.add_route(
        RouteDefinition::template("client/{client_id:number}/{tab:slug}", "client.html")
            .name("client")
            .extra_var("view", "full"),
    );
    router.add_route(RouteDefinition::static_page("about", 3, "about-us").name("about"));
    router.add_endpoint(Endpoint::get("/shop/v1/", "orders/{id:number}", |_req| async {
        HttpResponse::ok("")
    }));
    router
}

#[test]
fn test_rules_tags_and_pages_reach_host() {
    let mut router = router();
    let mut host = RecordingHost::default();
    let mut options = MemoryOptionStore::new();

    let report = router.compile_routes(&mut host, &mut options);
    assert!(report.flushed);
    assert_eq!(host.flushes, 1);

    assert_eq!(
        host.tags,
        vec![
            ("%route_name%".to_string(), "(.+)".to_string()),
            ("%client_id%".to_string(), "([0-9]+)".to_string()),
            ("%tab%".to_string(), "([a-z0-9-]+)".to_string()),
            ("%view%".to_string(), "([a-z0-9-]+)".to_string()),
        ]
    );

    assert_eq!(host.rules.len(), 1);
    let rule = &host.rules[0];
    assert_eq!(rule.pattern, "^client/([0-9]+)/([a-z0-9-]+)$");
    assert_eq!(rule.route_name, "client");
    assert_eq!(
        rule.bindings.iter().map(QueryBinding::name).collect::<Vec<_>>(),
        vec!["client_id", "tab", "view"]
    );

    assert_eq!(
        host.pages,
        vec![PageRule {
            pattern: "^about$".to_string(),
            page_id: 3,
            page_uri: "about-us".to_string(),
        }]
    );
    assert_eq!(
        options.get_option("plubo-routes-hash"),
        Some(router.routes_hash())
    );
}

#[test]
fn test_unchanged_routes_do_not_flush_again() {
    let mut router = router();
    let mut options = MemoryOptionStore::new();

    let mut first = RecordingHost::default();
    router.compile_routes(&mut first, &mut options);

    // A fresh host after a restart still receives every rule, but the stored
    // hash matches so nothing is persisted again.
    let mut second = RecordingHost::default();
    let report = router.compile_routes(&mut second, &mut options);
    assert!(!report.flushed);
    assert_eq!(second.flushes, 0);
    assert_eq!(second.rules, first.rules);
}

#[test]
fn test_endpoints_registered_with_trimmed_namespace() {
    let router = router();
    let mut host = RecordingHost::default();
    let mut options = MemoryOptionStore::new();

    let report = router.compile_endpoints(&mut host, &mut options);
    assert!(report.flushed);
    assert_eq!(host.rest.len(), 1);
    assert_eq!(host.rest[0].namespace, "shop/v1");
    assert_eq!(host.rest[0].pattern, "orders/(?P<id>[0-9]+)");
    assert_eq!(host.rest[0].method, http::Method::GET);
    assert_eq!(
        options.get_option("plubo-endpoints-hash"),
        Some(router.endpoints_hash())
    );

    let again = router.compile_endpoints(&mut RecordingHost::default(), &mut options);
    assert!(!again.flushed);
}
