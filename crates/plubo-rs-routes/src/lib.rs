//! # plubo-rs-routes
//!
//! Declarative routes and REST endpoints, compiled into host rewrite rules and
//! dispatched per request.
//!
//! ## Modules
//!
//! - [`route`] - [`RouteDefinition`] and its [`RouteTarget`] variants
//! - [`endpoint`] - REST [`Endpoint`] declarations
//! - [`router`] - The [`Router`]: registration, compilation and lookup
//! - [`host`] - Contracts the host runtime implements
//! - [`memory`] - In-memory host implementations
//! - [`hash`] - Content hashing for change detection
//! - [`processor`] - The per-request [`RouteProcessor`]
//!
//! ## Lifecycle
//!
//! Routes are declared once at startup and compiled with
//! [`Router::compile_routes`], which installs rewrite rules and reinstalls
//! them only when the declared set changed. Compilation takes `&mut Router`;
//! afterwards the router is only borrowed shared, by one [`RouteProcessor`]
//! per request.

pub mod endpoint;
pub mod hash;
pub mod host;
pub mod memory;
pub mod processor;
pub mod route;
pub mod router;

pub use endpoint::{Endpoint, PermissionPredicate};
pub use host::{
    HookSink, OptionStore, PageRule, QueryBinding, QueryVars, RestHost, RestRoute, RewriteHost,
    RewriteRule, TemplateLocator,
};
pub use memory::{
    DirectoryTemplateLocator, MemoryOptionStore, NullHooks, RestRegistry, RewriteTable,
};
pub use processor::{DispatchOutcome, ProcessorState, RouteProcessor, TemplateSource};
pub use route::{RouteConfig, RouteDefinition, RouteKind, RouteTarget};
pub use router::{CompileReport, MatchError, Router};
