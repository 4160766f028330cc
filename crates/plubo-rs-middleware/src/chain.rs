//! Continuation-passing middleware execution.
//!
//! A [`MiddlewareStack`] is an ordered list of units. Running it hands the
//! request to the first unit together with a [`Next`] holding the remaining
//! units and the final handler. Order is registration order; an empty stack
//! calls the handler directly.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use plubo_rs_http::{BoxFuture, HttpRequest, HttpResponse};

/// The final handler a chain wraps.
pub type Handler = Arc<dyn Fn(HttpRequest) -> BoxFuture + Send + Sync>;

/// Wraps an async closure as a [`Handler`].
///
/// # Examples
///
/// ```
/// use plubo_rs_middleware::handler;
/// use plubo_rs_http::HttpResponse;
///
/// let h = handler(|_req| async { HttpResponse::ok("done") });
/// ```
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// A unit of the middleware chain.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use plubo_rs_middleware::{Middleware, Next};
/// use plubo_rs_http::{HttpRequest, HttpResponse};
///
/// struct RequireJson;
///
/// #[async_trait]
/// impl Middleware for RequireJson {
///     async fn handle(&self, request: HttpRequest, next: Next<'_>) -> HttpResponse {
///         match request.header("content-type") {
///             Some(ct) if ct.starts_with("application/json") => next.run(request).await,
///             _ => HttpResponse::bad_request("JSON body required"),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handles the request, calling `next.run(request)` to continue the chain.
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> HttpResponse;

    /// A stable name used in logs and change-detection fingerprints.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The rest of the chain, as seen from inside a unit.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    handler: &'a Handler,
}

impl<'a> Next<'a> {
    /// Creates a continuation over `units` ending in `handler`.
    pub fn new(units: &'a [Arc<dyn Middleware>], handler: &'a Handler) -> Self {
        Self {
            remaining: units,
            handler,
        }
    }

    /// Passes the request to the next unit, or to the handler after the last unit.
    pub async fn run(self, request: HttpRequest) -> HttpResponse {
        match self.remaining.split_first() {
            Some((unit, rest)) => {
                tracing::trace!(unit = unit.name(), remaining = rest.len(), "middleware");
                unit.handle(request, Next::new(rest, self.handler)).await
            }
            None => (self.handler)(request).await,
        }
    }

    /// Returns the number of units still to run before the handler.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.remaining.len())
            .finish_non_exhaustive()
    }
}

/// An ordered list of middleware units attached to a route or endpoint.
///
/// # Examples
///
/// ```
/// use plubo_rs_middleware::MiddlewareStack;
/// use plubo_rs_middleware::builtin::CorsMiddleware;
///
/// let stack = MiddlewareStack::new().with(CorsMiddleware::default());
/// assert_eq!(stack.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    units: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a unit, builder style.
    #[must_use]
    pub fn with(mut self, unit: impl Middleware + 'static) -> Self {
        self.units.push(Arc::new(unit));
        self
    }

    /// Appends a unit.
    pub fn add(&mut self, unit: impl Middleware + 'static) {
        self.units.push(Arc::new(unit));
    }

    /// Appends an already shared unit.
    pub fn push(&mut self, unit: Arc<dyn Middleware>) {
        self.units.push(unit);
    }

    /// Returns the number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` if the stack has no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns the unit names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.units.iter().map(|u| u.name()).collect()
    }

    /// Runs the request through every unit and then the handler.
    pub async fn run(&self, request: HttpRequest, handler: &Handler) -> HttpResponse {
        Next::new(&self.units, handler).run(request).await
    }
}

impl fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareStack")
            .field("units", &self.names())
            .finish()
    }
}
