//! HTTP request type.
//!
//! [`HttpRequest`] is the request object REST middleware and endpoint handlers
//! receive. Besides the raw method, path, headers and body it carries a merged
//! parameter map (query string, form or JSON body, and named path captures)
//! that middleware can read and rewrite, plus a free-form attribute bag used to
//! hand data such as decoded token claims to later units.

use std::collections::{BTreeMap, HashMap};

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use serde_json::{Map, Value};

/// An API request as seen by middleware and endpoint handlers.
///
/// # Examples
///
/// ```
/// use plubo_rs_http::HttpRequest;
///
/// let order = HttpRequest::builder()
///     .path("/wp-json/shop/v1/orders/42")
///     .query_string("expand=items")
///     .url_param("id", "42")
///     .build();
///
/// assert_eq!(order.param_str("expand"), Some("items"));
/// assert_eq!(order.url_param("id"), Some("42"));
/// ```
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    headers: HeaderMap,
    params: Map<String, Value>,
    url_params: BTreeMap<String, String>,
    remote_addr: Option<String>,
    user_id: Option<String>,
    route: Option<String>,
    attributes: HashMap<String, Value>,
    body: Vec<u8>,
}

impl HttpRequest {
    /// Starts a `GET /` request with no headers or body.
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Creates an `HttpRequest` from an axum/http request head and its body bytes.
    pub fn from_parts(parts: http::request::Parts, body: Vec<u8>) -> Self {
        let mut builder = Self::builder()
            .method(parts.method)
            .path(parts.uri.path())
            .query_string(parts.uri.query().unwrap_or(""))
            .body(body);
        builder.headers = parts.headers;
        builder.build()
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The path the client asked for, query excluded.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The undecoded query, no `?`.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the path including the query string, the way the client sent it.
    pub fn request_uri(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header as text, `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the merged request parameters.
    pub const fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Returns one parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Returns one parameter if it is a string.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// Sets (or replaces) one parameter.
    pub fn set_param(&mut self, name: impl Into<String>, value: Value) {
        self.params.insert(name.into(), value);
    }

    /// Returns the named path captures.
    pub const fn url_params(&self) -> &BTreeMap<String, String> {
        &self.url_params
    }

    /// Returns one named path capture.
    pub fn url_param(&self, name: &str) -> Option<&str> {
        self.url_params.get(name).map(String::as_str)
    }

    /// Replaces the named path captures, mirroring them into the parameters.
    pub fn set_url_params(&mut self, url_params: BTreeMap<String, String>) {
        for (name, value) in &url_params {
            self.params.insert(name.clone(), Value::String(value.clone()));
        }
        self.url_params = url_params;
    }

    /// Returns the client address, if the host supplied one.
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    /// Returns the authenticated user identifier, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Sets the authenticated user identifier.
    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    /// Returns the registered route this request was matched against.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Records the registered route this request was matched against.
    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    /// Returns a request attribute set by an earlier middleware unit.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Stores a request attribute for later middleware units and the handler.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    /// The body exactly as received.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Builder for constructing [`HttpRequest`] instances.
///
/// Hosts use it to translate their native request object; tests use it to
/// build requests without a transport.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    headers: HeaderMap,
    url_params: BTreeMap<String, String>,
    remote_addr: Option<String>,
    user_id: Option<String>,
    route: Option<String>,
    body: Vec<u8>,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_owned(),
            query_string: String::new(),
            headers: HeaderMap::new(),
            url_params: BTreeMap::new(),
            remote_addr: None,
            user_id: None,
            route: None,
            body: Vec::new(),
        }
    }
}

impl HttpRequestBuilder {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Query text without the `?`. Its pairs become parameters.
    #[must_use]
    pub fn query_string(mut self, query: &str) -> Self {
        self.query_string = query.to_owned();
        self
    }

    /// Adds a header, skipping names or values `http` cannot represent.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::debug!(header = name, "dropping unrepresentable request header"),
        }
        self
    }

    /// Adds a named path capture.
    #[must_use]
    pub fn url_param(mut self, name: &str, value: &str) -> Self {
        self.url_params.insert(name.to_string(), value.to_string());
        self
    }

    /// Sets the client address.
    #[must_use]
    pub fn remote_addr(mut self, addr: &str) -> Self {
        self.remote_addr = Some(addr.to_string());
        self
    }

    /// Sets the authenticated user identifier.
    #[must_use]
    pub fn user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    /// Sets the registered route the request matched.
    #[must_use]
    pub fn route(mut self, route: &str) -> Self {
        self.route = Some(route.to_string());
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Sets a JSON body and the matching content type.
    #[must_use]
    pub fn json(self, value: &Value) -> Self {
        self.header("content-type", "application/json")
            .body(value.to_string().into_bytes())
    }

    /// Builds the [`HttpRequest`], merging query, body and path parameters.
    ///
    /// Body parameters override query parameters, and path captures override both.
    pub fn build(self) -> HttpRequest {
        let mut params = Map::new();
        merge_form(&mut params, &self.query_string);

        let content_type = self
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if content_type.starts_with("application/json") {
            match serde_json::from_slice::<Value>(&self.body) {
                Ok(Value::Object(body)) => params.extend(body),
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "ignoring undecodable JSON body"),
            }
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            merge_form(&mut params, &String::from_utf8_lossy(&self.body));
        }

        for (name, value) in &self.url_params {
            params.insert(name.clone(), Value::String(value.clone()));
        }

        HttpRequest {
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            headers: self.headers,
            params,
            url_params: self.url_params,
            remote_addr: self.remote_addr,
            user_id: self.user_id,
            route: self.route,
            attributes: HashMap::new(),
            body: self.body,
        }
    }
}

fn merge_form(params: &mut Map<String, Value>, encoded: &str) {
    for (key, value) in url::form_urlencoded::parse(encoded.as_bytes()) {
        params.insert(key.into_owned(), Value::String(value.into_owned()));
    }
}
