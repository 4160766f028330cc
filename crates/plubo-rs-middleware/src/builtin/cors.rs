use async_trait::async_trait;
use http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use http::{Method, StatusCode};

use plubo_rs_http::{HttpRequest, HttpResponse, JsonResponse};

use crate::chain::{Middleware, Next};

/// Adds CORS headers to every response it sees.
///
/// Preflight `OPTIONS` requests are answered immediately with 204 and the
/// headers, without running the rest of the chain. Requests whose method is
/// not in `allowed_methods` get a 405 JSON error.
///
/// # Examples
///
/// ```
/// use plubo_rs_middleware::builtin::CorsMiddleware;
///
/// let cors = CorsMiddleware::new("https://app.example.com")
///     .with_methods(&["GET", "PUT"]);
/// assert_eq!(cors.allowed_methods, vec!["GET", "PUT"]);
/// ```
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    /// Value of `Access-Control-Allow-Origin`.
    pub allowed_origin: String,
    /// Methods allowed on actual requests.
    pub allowed_methods: Vec<String>,
    /// Value list of `Access-Control-Allow-Headers`.
    pub allowed_headers: Vec<String>,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self {
            allowed_origin: "*".to_string(),
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
        }
    }
}

impl CorsMiddleware {
    /// Creates a unit with the default methods and headers for `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            allowed_origin: origin.into(),
            ..Self::default()
        }
    }

    /// Replaces the allowed methods.
    #[must_use]
    pub fn with_methods(mut self, methods: &[&str]) -> Self {
        self.allowed_methods = methods.iter().map(|m| m.to_uppercase()).collect();
        self
    }

    /// Replaces the allowed request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: &[&str]) -> Self {
        self.allowed_headers = headers.iter().map(|h| (*h).to_string()).collect();
        self
    }

    fn is_method_allowed(&self, method: &Method) -> bool {
        self.allowed_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method.as_str()))
    }

    fn add_cors_headers(&self, response: &mut HttpResponse) {
        let pairs = [
            (ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origin.clone()),
            (ACCESS_CONTROL_ALLOW_METHODS, self.allowed_methods.join(", ")),
            (ACCESS_CONTROL_ALLOW_HEADERS, self.allowed_headers.join(", ")),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                response.headers_mut().insert(name, value);
            }
        }
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> HttpResponse {
        let mut response = if request.method() == Method::OPTIONS {
            HttpResponse::no_content()
        } else if !self.is_method_allowed(request.method()) {
            tracing::debug!(method = %request.method(), "CORS method rejected");
            JsonResponse::with_status(
                StatusCode::METHOD_NOT_ALLOWED,
                &serde_json::json!({ "error": "Method not allowed" }),
            )
        } else {
            next.run(request).await
        };
        self.add_cors_headers(&mut response);
        response
    }

    fn name(&self) -> &'static str {
        "cors"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{handler, MiddlewareStack};

    fn ok_handler() -> crate::Handler {
        handler(|_req| async { HttpResponse::ok("body") })
    }

    fn request(method: Method) -> HttpRequest {
        HttpRequest::builder().method(method).path("/api").build()
    }

    #[tokio::test]
    async fn test_headers_added_to_allowed_request() {
        let stack = MiddlewareStack::new().with(CorsMiddleware::default());
        let response = stack.run(request(Method::GET), &ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        assert_eq!(
            response.header("access-control-allow-methods"),
            Some("GET, POST, OPTIONS")
        );
        assert_eq!(
            response.header("access-control-allow-headers"),
            Some("Content-Type, Authorization")
        );
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let stack = MiddlewareStack::new().with(CorsMiddleware::default());
        let h = handler(|_req| async { HttpResponse::server_error("handler ran") });
        let response = stack.run(request(Method::OPTIONS), &h).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn test_disallowed_method_is_405() {
        let stack = MiddlewareStack::new().with(CorsMiddleware::default());
        let response = stack.run(request(Method::DELETE), &ok_handler()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.json().unwrap(),
            serde_json::json!({"error": "Method not allowed"})
        );
    }

    #[tokio::test]
    async fn test_custom_origin_and_methods() {
        let cors = CorsMiddleware::new("https://app.example.com").with_methods(&["delete"]);
        let stack = MiddlewareStack::new().with(cors);
        let response = stack.run(request(Method::DELETE), &ok_handler()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.header("access-control-allow-origin"),
            Some("https://app.example.com")
        );
    }
}
