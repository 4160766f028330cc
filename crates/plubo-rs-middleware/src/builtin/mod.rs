//! Built-in middleware units.
//!
//! - [`CacheMiddleware`] - Caches successful responses by request URI
//! - [`CorsMiddleware`] - Adds CORS headers and answers preflight requests
//! - [`RateLimitMiddleware`] - Fixed-window request limiting
//! - [`JwtMiddleware`] - HS256 bearer token validation
//! - [`SchemaValidator`] - JSON-schema validation and sanitization of parameters

mod cache;
mod cors;
mod jwt;
mod rate_limit;
mod schema;

pub use cache::CacheMiddleware;
pub use cors::CorsMiddleware;
pub use jwt::{JwtConfig, JwtMiddleware, JWT_CLAIMS_ATTRIBUTE};
pub use rate_limit::{RateLimitKey, RateLimitMiddleware};
pub use schema::SchemaValidator;
