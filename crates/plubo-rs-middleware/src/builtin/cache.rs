use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use sha2::{Digest, Sha256};

use plubo_rs_core::cache::{CacheValue, KeyValueStore};
use plubo_rs_http::{HttpRequest, HttpResponse};

use crate::chain::{Middleware, Next};

/// Caches successful responses in a [`KeyValueStore`], keyed by request URI.
///
/// Only `GET` and `HEAD` requests take part; other methods go straight to
/// the next handler and never see an `X-Cache` header. Only 2xx responses
/// are stored, and never a [deferred](HttpResponse::deferred) placeholder.
/// Responses carry `X-Cache: HIT` when served from the store and
/// `X-Cache: MISS` otherwise. Store failures are logged and the request
/// proceeds uncached.
pub struct CacheMiddleware {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl CacheMiddleware {
    /// The default time-to-live of a cached response.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    /// Creates a cache with the default TTL.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl: Self::DEFAULT_TTL,
        }
    }

    /// Sets the time-to-live. A zero TTL is replaced by the default.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        if ttl.is_zero() {
            tracing::warn!("cache TTL of zero replaced by the default");
            self.ttl = Self::DEFAULT_TTL;
        } else {
            self.ttl = ttl;
        }
        self
    }

    /// Returns the configured TTL.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the store key for a request URI.
    pub fn cache_key(request_uri: &str) -> String {
        format!("route_cache_{}", hex::encode(Sha256::digest(request_uri.as_bytes())))
    }

    async fn lookup(&self, key: &str) -> Option<HttpResponse> {
        match self.store.get(key).await {
            Ok(Some(value)) => value.as_json().and_then(HttpResponse::from_snapshot),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, key, "cache lookup failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for CacheMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheMiddleware")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Middleware for CacheMiddleware {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> HttpResponse {
        if !matches!(*request.method(), Method::GET | Method::HEAD) {
            tracing::trace!(method = %request.method(), "cache bypassed");
            return next.run(request).await;
        }
        let key = Self::cache_key(&request.request_uri());

        if let Some(mut cached) = self.lookup(&key).await {
            tracing::debug!(key, "cache hit");
            cached.insert_header("x-cache", "HIT");
            return cached;
        }

        let mut response = next.run(request).await;
        if response.status().is_success() && !response.is_deferred() {
            let snapshot = CacheValue::Json(response.to_snapshot());
            if let Err(e) = self.store.set(&key, snapshot, Some(self.ttl)).await {
                tracing::warn!(error = %e, key, "cache store failed");
            }
        }
        response.insert_header("x-cache", "MISS");
        response
    }

    fn name(&self) -> &'static str {
        "cache"
    }
}
