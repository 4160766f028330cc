//! Responses produced by routes, endpoints and middleware.
//!
//! [`HttpResponse`] is a plain value: a status, extra headers, a media type
//! and a byte body. [`JsonResponse`] and [`HttpResponseRedirect`] build the
//! two shapes the dispatcher emits most, the `{code, message, data}` error
//! payload and a `Location` redirect.

use axum::response::IntoResponse;
use http::header::{HeaderName, ALLOW, CACHE_CONTROL, CONTENT_TYPE, EXPIRES, LOCATION};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::{json, Map, Value};

use plubo_rs_core::PluboError;

const DEFAULT_MEDIA_TYPE: &str = "text/html";
const JSON_MEDIA_TYPE: &str = "application/json";

/// A response on its way back to the host.
///
/// ```
/// use plubo_rs_http::HttpResponse;
///
/// let page = HttpResponse::ok("<h1>Client</h1>");
/// assert_eq!(page.status().as_u16(), 200);
/// assert_eq!(page.content_type(), "text/html");
/// ```
#[derive(Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    media_type: String,
    body: Vec<u8>,
    deferred: bool,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status.as_u16())
            .field("media_type", &self.media_type)
            .field("headers", &self.headers.len())
            .field("body_len", &self.body.len())
            .field("deferred", &self.deferred)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// An HTML response with `status` and `body`.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            media_type: DEFAULT_MEDIA_TYPE.to_owned(),
            body: body.into().into_bytes(),
            deferred: false,
        }
    }

    /// An empty response with a numeric status. Codes `http` rejects become 500.
    pub fn status_only(status: u16) -> Self {
        Self::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            String::new(),
        )
    }

    /// 200.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// 204 with an empty body.
    pub fn no_content() -> Self {
        Self::status_only(204)
    }

    /// A 204 placeholder for a request whose real response is produced after
    /// the middleware chain returns, such as a page template.
    ///
    /// Middleware may add headers to it. Caches must not store it, and the
    /// flag is not carried by [`to_snapshot`](Self::to_snapshot).
    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::no_content()
        }
    }

    /// Returns `true` for a [`deferred`](Self::deferred) placeholder.
    pub const fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn not_found(body: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, body)
    }

    pub fn forbidden(body: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, body)
    }

    pub fn bad_request(body: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, body)
    }

    pub fn server_error(body: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// 405 listing `methods` in the `Allow` header.
    pub fn not_allowed(methods: &[&str]) -> Self {
        let allow = methods.join(", ");
        let mut response = Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method not allowed; use one of: {allow}"),
        );
        response.insert_header(ALLOW.as_str(), &allow);
        response
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Headers set on the response, not including `Content-Type`.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// A header as text, `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Sets a header, replacing any previous value. Names or values `http`
    /// cannot represent are dropped.
    pub fn insert_header(&mut self, name: &str, value: &str) {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            return;
        };
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
    }

    /// Marks the response uncacheable by browsers and proxies.
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, must-revalidate, max-age=0, no-store, private"),
        );
        self.headers
            .insert(EXPIRES, HeaderValue::from_static("Wed, 11 Jan 1984 05:00:00 GMT"));
        self
    }

    pub fn content_type(&self) -> &str {
        &self.media_type
    }

    pub fn set_content_type(&mut self, media_type: impl Into<String>) {
        self.media_type = media_type.into();
    }

    pub fn content_bytes(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The body as JSON, `None` when it does not parse.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    fn content_type_header(&self) -> String {
        let textual = self.media_type.starts_with("text/") || self.media_type.contains("json");
        if textual && !self.media_type.contains("charset") {
            format!("{}; charset=utf-8", self.media_type)
        } else {
            self.media_type.clone()
        }
    }

    /// Captures the response as JSON so a cache store can hold it.
    pub fn to_snapshot(&self) -> Value {
        let headers: Map<String, Value> = self
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), Value::from(value.to_str().ok()?))))
            .collect();
        json!({
            "status": self.status.as_u16(),
            "content_type": self.media_type,
            "headers": headers,
            "body": self.text(),
        })
    }

    /// Restores a [`to_snapshot`](Self::to_snapshot) capture. `None` when the
    /// status or body is missing.
    pub fn from_snapshot(snapshot: &Value) -> Option<Self> {
        let status = u16::try_from(snapshot["status"].as_u64()?).ok()?;
        let mut response = Self::status_only(status);
        response.body = snapshot["body"].as_str()?.as_bytes().to_vec();
        if let Some(media_type) = snapshot["content_type"].as_str() {
            response.media_type = media_type.to_owned();
        }
        if let Some(headers) = snapshot["headers"].as_object() {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    response.insert_header(name, value);
                }
            }
        }
        Some(response)
    }
}

impl From<PluboError> for HttpResponse {
    fn from(error: PluboError) -> Self {
        JsonResponse::from_error("plubo_error", &error)
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> axum::response::Response {
        let content_type = HeaderValue::from_str(&self.content_type_header())
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MEDIA_TYPE));
        let mut response = (self.status, self.body).into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, content_type);
        headers.extend(self.headers);
        response
    }
}

/// Builders for `application/json` responses.
pub struct JsonResponse;

impl JsonResponse {
    /// 200 with `data` serialized.
    pub fn new<T: serde::Serialize>(data: &T) -> HttpResponse {
        Self::with_status(StatusCode::OK, data)
    }

    /// `data` serialized under `status`. A value that fails to serialize
    /// yields a 500.
    pub fn with_status<T: serde::Serialize>(status: StatusCode, data: &T) -> HttpResponse {
        match serde_json::to_string(data) {
            Ok(body) => {
                let mut response = HttpResponse::new(status, body);
                response.set_content_type(JSON_MEDIA_TYPE);
                response
            }
            Err(e) => {
                tracing::error!(error = %e, "response payload is not serializable");
                HttpResponse::server_error("Response payload could not be encoded")
            }
        }
    }

    /// The `{"code", "message", "data": {"status", ...}}` payload for
    /// `error`, sent with the error's own status.
    pub fn from_error(code: &str, error: &PluboError) -> HttpResponse {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::with_status(status, &error.to_payload(code))
    }
}

/// Builders for `Location` redirects.
pub struct HttpResponseRedirect;

impl HttpResponseRedirect {
    /// A 302 to `url`.
    pub fn new(url: &str) -> HttpResponse {
        Self::with_status(url, 302)
    }

    /// A redirect to `url` with `status`, which must be a 3xx code up to 308;
    /// anything else becomes 302.
    pub fn with_status(url: &str, status: u16) -> HttpResponse {
        let status = if (300..=308).contains(&status) { status } else { 302 };
        let mut response = HttpResponse::status_only(status);
        response.insert_header(LOCATION.as_str(), url);
        response
    }
}
