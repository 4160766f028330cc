//! # plubo-rs-test
//!
//! Testing utilities for plubo-rs. Provides an in-memory [`TestClient`] that
//! compiles a [`Router`](plubo_rs_routes::Router) into reference hosts and
//! drives page and REST requests through it. Also here: fixed identities, a
//! stock role table, a hook recorder and a JWT token builder.
//!
//! ## Modules
//!
//! - [`client`] - [`TestClient`] and [`Visit`]
//! - [`hooks`] - [`RecordingHooks`]
//! - [`identity`] - [`StaticIdentity`], [`CountingIdentity`] and [`default_roles`]
//! - [`jwt`] - HS256 token encoding

pub mod client;
pub mod hooks;
pub mod identity;
pub mod jwt;

pub use client::{TestClient, Visit};
pub use hooks::{FiredHook, RecordingHooks};
pub use identity::{default_roles, CountingIdentity, StaticIdentity};
pub use jwt::{bearer, encode_hs256, now};
