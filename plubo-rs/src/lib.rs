//! # plubo-rs
//!
//! Declarative URL routing for a host web runtime: page routes compiled into
//! rewrite rules, REST endpoints registered with the host, per-route
//! middleware and access control.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient access.
//! You can depend on `plubo-rs` to get everything, or depend on individual
//! crates for finer-grained control.
//!
//! ```
//! use plubo_rs::prelude::*;
//!
//! let mut router = Router::new();
//! router.add_route(
//!     RouteDefinition::template("client/{client_id:number}", "client.html")
//!         .name("client")
//!         .policy(AccessPolicy::new().guest(false).redirect("/login")),
//! );
//! router.add_endpoint(Endpoint::get("shop/v1", "orders/{id:number}", |request| async move {
//!     HttpResponse::ok(request.url_param("id").unwrap_or_default().to_string())
//! }));
//!
//! let mut rules = RewriteTable::new();
//! let report = router.compile_routes(&mut rules, &mut MemoryOptionStore::new());
//! assert_eq!(report.rules, vec!["^client/([0-9]+)$"]);
//! ```

/// Errors, settings, logging, argument maps and the key-value store.
pub use plubo_rs_core as core;

/// Requests, responses and the path compiler.
pub use plubo_rs_http as http;

/// The middleware chain and built-in units.
#[cfg(feature = "middleware")]
pub use plubo_rs_middleware as middleware;

/// Identities, access policies and basic auth.
#[cfg(feature = "auth")]
pub use plubo_rs_auth as auth;

/// Routes, endpoints, the router and the request processor.
#[cfg(feature = "routes")]
pub use plubo_rs_routes as routes;

/// Testing utilities.
#[cfg(feature = "testing")]
pub use plubo_rs_test as test;

// Third-party re-exports
pub use async_trait;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;

/// The types most applications need.
pub mod prelude {
    pub use plubo_rs_core::{AccessMode, ArgumentMap, PluboError, PluboResult, Resolvable, Settings};
    pub use plubo_rs_http::{HttpRequest, HttpResponse, HttpResponseRedirect, JsonResponse};

    #[cfg(feature = "middleware")]
    pub use plubo_rs_middleware::{Middleware, MiddlewareStack, Next};

    #[cfg(feature = "auth")]
    pub use plubo_rs_auth::{AccessPolicy, BasicAuth, Identity};

    #[cfg(feature = "routes")]
    pub use plubo_rs_routes::{
        DispatchOutcome, Endpoint, MemoryOptionStore, RestRegistry, RewriteTable, RouteDefinition,
        RouteProcessor, Router,
    };
}
