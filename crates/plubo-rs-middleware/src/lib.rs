//! # plubo-rs-middleware
//!
//! The middleware chain that wraps route and endpoint handlers, and the
//! built-in units.
//!
//! A unit receives the request and a [`Next`] continuation. Calling
//! [`Next::run`] passes control to the following unit (or, after the last one,
//! to the handler); returning without calling it short-circuits the chain and
//! the unit's response becomes the overall response.
//!
//! ## Modules
//!
//! - [`chain`] - [`Middleware`], [`Next`] and [`MiddlewareStack`]
//! - [`builtin`] - Cache, CORS, rate limiting, JWT validation and schema validation

pub mod builtin;
pub mod chain;

pub use chain::{handler, Handler, Middleware, MiddlewareStack, Next};
