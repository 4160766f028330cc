//! In-memory test client for plubo-rs.
//!
//! [`TestClient`] compiles a [`Router`] into a [`RewriteTable`] and a
//! [`RestRegistry`], then plays the host's part for each request: page
//! requests are resolved against the installed rewrite rules and handed to a
//! fresh [`RouteProcessor`]; REST requests are served by the registry.
//!
//! ## Usage
//!
//! ```rust
//! use plubo_rs_routes::{RouteDefinition, Router};
//! use plubo_rs_test::TestClient;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut router = Router::new();
//! router.add_route(RouteDefinition::template("client/{client_id:number}", "client.html").name("client"));
//! let client = TestClient::new(router);
//!
//! let visit = client.visit("/client/42").await.unwrap();
//! assert_eq!(visit.args.get("client_id"), Some("42"));
//! assert_eq!(visit.status(), 200);
//! # });
//! ```

use std::sync::Arc;

use http::{HeaderMap, Method};
use serde_json::Value;

use plubo_rs_auth::{AnonymousUser, Identity};
use plubo_rs_core::{ArgumentMap, PluboResult};
use plubo_rs_http::{HttpRequest, HttpResponse};
use plubo_rs_routes::{
    CompileReport, DispatchOutcome, MemoryOptionStore, ProcessorState, QueryVars, RestRegistry,
    RewriteTable, RouteProcessor, Router, TemplateLocator,
};

use crate::hooks::RecordingHooks;

/// The result of one page request.
#[derive(Debug, Clone)]
pub struct Visit {
    /// Query variables produced by the rewrite rules, `None` when no rule matched.
    pub query_vars: Option<QueryVars>,
    /// What the processor decided.
    pub outcome: DispatchOutcome,
    /// The response for terminal outcomes.
    pub response: Option<HttpResponse>,
    /// Headers route middleware added while passing the request on. The
    /// host sends these with template, action and static page outcomes.
    pub headers: HeaderMap,
    /// Arguments of the matched route.
    pub args: ArgumentMap,
    /// Processor state after the request.
    pub state: ProcessorState,
    /// Body classes of a template route.
    pub body_classes: Vec<String>,
}

impl Visit {
    /// The status the host would send.
    ///
    /// A request no rule matched falls through to the host, which answers 404.
    pub fn status(&self) -> u16 {
        if let Some(response) = &self.response {
            return response.status().as_u16();
        }
        match &self.outcome {
            DispatchOutcome::Template { status, .. } | DispatchOutcome::ActionFired { status, .. } => {
                *status
            }
            DispatchOutcome::StaticPage { .. } => 200,
            _ => 404,
        }
    }

    /// Returns a response header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.as_ref()?.header(name)
    }
}

/// Drives page and REST requests through a compiled [`Router`].
pub struct TestClient {
    router: Router,
    rewrites: RewriteTable,
    rest: RestRegistry,
    options: MemoryOptionStore,
    hooks: RecordingHooks,
    templates: Option<Box<dyn TemplateLocator>>,
    identity: Arc<dyn Identity>,
    route_report: CompileReport,
    endpoint_report: CompileReport,
}

impl TestClient {
    /// Compiles `router` and wraps it. Requests start out anonymous.
    pub fn new(router: Router) -> Self {
        let mut client = Self {
            router,
            rewrites: RewriteTable::new(),
            rest: RestRegistry::new(),
            options: MemoryOptionStore::new(),
            hooks: RecordingHooks::new(),
            templates: None,
            identity: Arc::new(AnonymousUser),
            route_report: CompileReport::default(),
            endpoint_report: CompileReport::default(),
        };
        client.recompile();
        client
    }

    /// Sets the host template locator.
    #[must_use]
    pub fn with_templates(mut self, locator: impl TemplateLocator + 'static) -> Self {
        self.templates = Some(Box::new(locator));
        self
    }

    /// Compiles routes and endpoints again, as the host does on every boot.
    pub fn recompile(&mut self) -> (&CompileReport, &CompileReport) {
        self.route_report = self.router.compile_routes(&mut self.rewrites, &mut self.options);
        self.endpoint_report = self.router.compile_endpoints(&mut self.rest, &mut self.options);
        (&self.route_report, &self.endpoint_report)
    }

    /// Makes subsequent page requests as `identity`.
    pub fn login(&mut self, identity: impl Identity + 'static) {
        self.identity = Arc::new(identity);
    }

    /// Makes subsequent page requests anonymous.
    pub fn logout(&mut self) {
        self.identity = Arc::new(AnonymousUser);
    }

    /// Returns the router.
    pub const fn router(&self) -> &Router {
        &self.router
    }

    /// Returns the router for adding declarations before [`recompile`](Self::recompile).
    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Returns the installed rewrite rules.
    pub const fn rewrites(&self) -> &RewriteTable {
        &self.rewrites
    }

    /// Returns the REST registry.
    pub const fn rest(&self) -> &RestRegistry {
        &self.rest
    }

    /// Returns the stored options, including the content hashes.
    pub const fn options(&self) -> &MemoryOptionStore {
        &self.options
    }

    /// Returns the hook recorder.
    pub const fn hooks(&self) -> &RecordingHooks {
        &self.hooks
    }

    /// Report of the last route compilation.
    pub const fn route_report(&self) -> &CompileReport {
        &self.route_report
    }

    /// Report of the last endpoint compilation.
    pub const fn endpoint_report(&self) -> &CompileReport {
        &self.endpoint_report
    }

    // ── Page requests ────────────────────────────────────────────────

    /// Sends a `GET` page request for `path`.
    pub async fn visit(&self, path: &str) -> PluboResult<Visit> {
        self.visit_request(HttpRequest::builder().path(path).build())
            .await
    }

    /// Sends a page request.
    pub async fn visit_request(&self, request: HttpRequest) -> PluboResult<Visit> {
        let query_vars = self.rewrites.resolve(request.path());
        let mut processor = RouteProcessor::new(&self.router, &self.hooks);
        if let Some(locator) = self.templates.as_deref() {
            processor = processor.with_templates(locator);
        }

        let outcome = processor
            .process(
                &request,
                &query_vars.clone().unwrap_or_default(),
                &*self.identity,
            )
            .await?;

        Ok(Visit {
            query_vars,
            response: processor.respond(outcome.clone()),
            headers: processor.response_headers().clone(),
            outcome,
            args: processor.args().clone(),
            state: processor.state(),
            body_classes: processor.body_classes(),
        })
    }

    // ── REST requests ────────────────────────────────────────────────

    /// Sends a `GET` REST request.
    pub async fn get(&self, path: &str) -> HttpResponse {
        self.send(HttpRequest::builder().path(path).build()).await
    }

    /// Sends a `POST` REST request with a JSON body.
    pub async fn post_json(&self, path: &str, body: &Value) -> HttpResponse {
        self.send(
            HttpRequest::builder()
                .method(Method::POST)
                .path(path)
                .json(body)
                .build(),
        )
        .await
    }

    /// Sends a REST request.
    pub async fn send(&self, request: HttpRequest) -> HttpResponse {
        self.rest.serve(request).await
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("router", &self.router)
            .field("rewrites", &self.rewrites)
            .field("rest", &self.rest)
            .field("identity", &self.identity.id())
            .finish_non_exhaustive()
    }
}
