//! # plubo-rs-http
//!
//! HTTP layer for the plubo-rs routing layer. Provides the request and
//! response types middleware and handlers exchange, and the URL machinery
//! that turns `{name:type}` path templates into matchable patterns.
//!
//! ## Modules
//!
//! - [`request`] - [`HttpRequest`] and its builder
//! - [`response`] - [`HttpResponse`], [`JsonResponse`] and redirect helpers
//! - [`urls`] - The placeholder vocabulary and the path compiler

pub mod request;
pub mod response;
pub mod urls;

use std::future::Future;
use std::pin::Pin;

pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{HttpResponse, HttpResponseRedirect, JsonResponse};

/// A boxed, pinned future resolving to an [`HttpResponse`].
pub type BoxFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;
