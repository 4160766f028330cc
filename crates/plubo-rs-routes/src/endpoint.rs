//! REST endpoint declarations.
//!
//! An [`Endpoint`] names a namespace, a path template with `{name:type}`
//! placeholders, one HTTP method and a handler. Requests reach the handler
//! only after the optional permission predicate allowed them and every unit
//! of the endpoint's [`MiddlewareStack`] passed them on.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::Method;
use serde_json::json;

use plubo_rs_http::{HttpRequest, HttpResponse};
use plubo_rs_middleware::{handler, Handler, Middleware, MiddlewareStack};

/// Decides whether a REST request may reach its endpoint.
pub type PermissionPredicate = Arc<dyn Fn(&HttpRequest) -> bool + Send + Sync>;

/// A REST endpoint.
///
/// # Examples
///
/// ```
/// use plubo_rs_http::{HttpResponse, JsonResponse};
/// use plubo_rs_routes::Endpoint;
///
/// let endpoint = Endpoint::get("shop/v1", "orders/{id:number}", |request| async move {
///     let id = request.url_param("id").unwrap_or_default().to_string();
///     JsonResponse::new(&serde_json::json!({ "id": id }))
/// })
/// .permission(|request| request.user_id().is_some());
///
/// assert_eq!(endpoint.namespace(), "shop/v1");
/// assert_eq!(endpoint.method(), &http::Method::GET);
/// ```
#[derive(Clone)]
pub struct Endpoint {
    namespace: String,
    path: String,
    method: Method,
    handler: Handler,
    permission: Option<PermissionPredicate>,
    middleware: MiddlewareStack,
}

impl Endpoint {
    /// Declares an endpoint for `method`.
    pub fn new<F, Fut>(method: Method, namespace: &str, path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        Self {
            namespace: namespace.trim_matches('/').to_string(),
            path: path.to_string(),
            method,
            handler: handler(f),
            permission: None,
            middleware: MiddlewareStack::new(),
        }
    }

    /// Declares a `GET` endpoint.
    pub fn get<F, Fut>(namespace: &str, path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        Self::new(Method::GET, namespace, path, f)
    }

    /// Declares a `POST` endpoint.
    pub fn post<F, Fut>(namespace: &str, path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        Self::new(Method::POST, namespace, path, f)
    }

    /// Declares a `PUT` endpoint.
    pub fn put<F, Fut>(namespace: &str, path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        Self::new(Method::PUT, namespace, path, f)
    }

    /// Declares a `DELETE` endpoint.
    pub fn delete<F, Fut>(namespace: &str, path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        Self::new(Method::DELETE, namespace, path, f)
    }

    /// Sets the permission predicate. Without one every request is allowed.
    #[must_use]
    pub fn permission<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&HttpRequest) -> bool + Send + Sync + 'static,
    {
        self.permission = Some(Arc::new(predicate));
        self
    }

    /// Appends a middleware unit.
    #[must_use]
    pub fn middleware(mut self, unit: impl Middleware + 'static) -> Self {
        self.middleware.add(unit);
        self
    }

    /// Replaces the middleware stack.
    #[must_use]
    pub fn with_stack(mut self, stack: MiddlewareStack) -> Self {
        self.middleware = stack;
        self
    }

    /// Returns the namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the accepted method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the middleware stack.
    pub const fn middleware_stack(&self) -> &MiddlewareStack {
        &self.middleware
    }

    /// Returns the permission predicate, allowing everything when none is set.
    pub fn permission_predicate(&self) -> PermissionPredicate {
        self.permission
            .clone()
            .unwrap_or_else(|| Arc::new(|_: &HttpRequest| true))
    }

    /// Evaluates the permission predicate.
    pub fn allows(&self, request: &HttpRequest) -> bool {
        self.permission.as_ref().map_or(true, |p| p(request))
    }

    /// Runs the middleware stack and then the handler.
    pub async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        self.middleware.run(request, &self.handler).await
    }

    /// A stable JSON description used for change detection.
    pub fn fingerprint(&self) -> serde_json::Value {
        json!({
            "namespace": self.namespace,
            "path": self.path,
            "method": self.method.as_str(),
        })
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("namespace", &self.namespace)
            .field("path", &self.path)
            .field("method", &self.method)
            .field("permission", &self.permission.is_some())
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use plubo_rs_middleware::Next;

    struct Stamp;

    #[async_trait]
    impl Middleware for Stamp {
        async fn handle(&self, mut request: HttpRequest, next: Next<'_>) -> HttpResponse {
            request.set_attribute("stamped", serde_json::Value::Bool(true));
            next.run(request).await
        }

        fn name(&self) -> &'static str {
            "stamp"
        }
    }

    #[test]
    fn test_method_constructors() {
        let noop = |_req: HttpRequest| async { HttpResponse::no_content() };
        assert_eq!(Endpoint::get("a/v1", "x", noop).method(), &Method::GET);
        assert_eq!(Endpoint::post("a/v1", "x", noop).method(), &Method::POST);
        assert_eq!(Endpoint::put("a/v1", "x", noop).method(), &Method::PUT);
        assert_eq!(Endpoint::delete("a/v1", "x", noop).method(), &Method::DELETE);
    }

    #[test]
    fn test_namespace_is_trimmed() {
        let endpoint = Endpoint::get("/shop/v1/", "orders", |_req| async { HttpResponse::ok("") });
        assert_eq!(endpoint.namespace(), "shop/v1");
    }

    #[test]
    fn test_permission_defaults_to_allow() {
        let endpoint = Endpoint::get("shop/v1", "orders", |_req| async { HttpResponse::ok("") });
        let request = HttpRequest::builder().build();
        assert!(endpoint.allows(&request));
        assert!((endpoint.permission_predicate())(&request));

        let guarded = endpoint.permission(|r| r.user_id().is_some());
        assert!(!guarded.allows(&request));
        assert!(guarded.allows(&HttpRequest::builder().user_id("3").build()));
    }

    #[tokio::test]
    async fn test_dispatch_runs_stack_before_handler() {
        let endpoint = Endpoint::post("shop/v1", "orders", |req: HttpRequest| async move {
            match req.attribute("stamped") {
                Some(_) => HttpResponse::ok("stamped"),
                None => HttpResponse::bad_request("unstamped"),
            }
        })
        .middleware(Stamp);

        let response = endpoint.dispatch(HttpRequest::builder().build()).await;
        assert_eq!(response.text(), "stamped");
        assert_eq!(endpoint.middleware_stack().names(), vec!["stamp"]);
    }

    #[test]
    fn test_fingerprint_ignores_handler() {
        let a = Endpoint::get("shop/v1", "orders", |_req| async { HttpResponse::ok("a") });
        let b = Endpoint::get("shop/v1", "orders", |_req| async { HttpResponse::ok("b") });
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint()["method"], "GET");
    }
}
