use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;

use plubo_rs_core::cache::KeyValueStore;
use plubo_rs_http::{HttpRequest, HttpResponse, JsonResponse};

use crate::chain::{Middleware, Next};

/// What a rate-limit counter is keyed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateLimitKey {
    /// The client address.
    #[default]
    ClientIp,
    /// The authenticated user, falling back to the client address for guests.
    User,
    /// The matched route, shared by every client.
    Route,
}

/// Fixed-window request limiting backed by a [`KeyValueStore`] counter.
///
/// The first request in a window creates the counter with the window as its
/// TTL. Once the counter passes `max_requests` the chain is short-circuited
/// with 429 until the counter expires.
pub struct RateLimitMiddleware {
    store: Arc<dyn KeyValueStore>,
    max_requests: u32,
    window: Duration,
    key: RateLimitKey,
}

impl RateLimitMiddleware {
    /// Default number of requests per window.
    pub const DEFAULT_MAX_REQUESTS: u32 = 10;
    /// Default window length.
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

    /// Creates a limiter with the default limit and window, keyed by client IP.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            max_requests: Self::DEFAULT_MAX_REQUESTS,
            window: Self::DEFAULT_WINDOW,
            key: RateLimitKey::default(),
        }
    }

    /// Sets the number of requests allowed per window. Zero is replaced by the default.
    #[must_use]
    pub fn with_max_requests(mut self, max_requests: u32) -> Self {
        if max_requests == 0 {
            tracing::warn!("rate limit of zero replaced by the default");
            self.max_requests = Self::DEFAULT_MAX_REQUESTS;
        } else {
            self.max_requests = max_requests;
        }
        self
    }

    /// Sets the window length. Windows shorter than a second are replaced by the default.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        if window.as_secs() == 0 {
            tracing::warn!(?window, "rate limit window replaced by the default");
            self.window = Self::DEFAULT_WINDOW;
        } else {
            self.window = window;
        }
        self
    }

    /// Sets what the counter is keyed on.
    #[must_use]
    pub const fn keyed_by(mut self, key: RateLimitKey) -> Self {
        self.key = key;
        self
    }

    /// Returns the configured request limit.
    pub const fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Returns the configured window.
    pub const fn window(&self) -> Duration {
        self.window
    }

    fn counter_key(&self, request: &HttpRequest) -> String {
        let ip = request.remote_addr().unwrap_or("unknown");
        match self.key {
            RateLimitKey::ClientIp => format!("rate_limit_{ip}"),
            RateLimitKey::User => request.user_id().map_or_else(
                || format!("rate_limit_{ip}"),
                |user| format!("rate_limit_user_{user}"),
            ),
            RateLimitKey::Route => {
                format!("rate_limit_route_{}", request.route().unwrap_or(request.path()))
            }
        }
    }

    fn too_many_requests(&self) -> HttpResponse {
        let mut response = JsonResponse::with_status(
            StatusCode::TOO_MANY_REQUESTS,
            &serde_json::json!({ "error": "Too many requests" }),
        );
        response.insert_header("retry-after", &self.window.as_secs().to_string());
        response
    }
}

impl std::fmt::Debug for RateLimitMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitMiddleware")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> HttpResponse {
        let key = self.counter_key(&request);
        let limit = i64::from(self.max_requests);

        let count = match self.store.incr(&key, 1, self.window).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, key, "rate limit counter unavailable");
                return next.run(request).await;
            }
        };

        let mut response = if count > limit {
            tracing::info!(key, count, limit, "rate limit exceeded");
            self.too_many_requests()
        } else {
            next.run(request).await
        };

        let remaining = (limit - count).max(0);
        response.insert_header("x-ratelimit-limit", &limit.to_string());
        response.insert_header("x-ratelimit-remaining", &remaining.to_string());
        response
    }

    fn name(&self) -> &'static str {
        "rate_limit"
    }
}
