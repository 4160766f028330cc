//! # plubo-rs-auth
//!
//! Authorization for plubo-rs routes and endpoints.
//!
//! - **Identities** exposing existence, roles and capabilities (`identity`, `user`)
//! - **Roles** as named capability bundles (`roles`)
//! - **The permission checker** deciding route access with fixed precedence (`permissions`)
//! - **Basic auth** credential checks for template routes (`basic`)
//! - **The permissions middleware** for REST endpoints (`middleware`)
//!
//! The identity subsystem itself (sessions, login, password storage) belongs
//! to the host; this crate only consumes the [`Identity`] it exposes.

pub mod basic;
pub mod identity;
pub mod middleware;
pub mod permissions;
pub mod roles;
pub mod user;

pub use basic::BasicAuth;
pub use identity::{Identity, IdentityProvider, UserDirectory};
pub use middleware::{AccessType, PermissionsMiddleware};
pub use permissions::{AccessDecision, AccessPolicy, ForbiddenAction, PermissionChecker};
pub use roles::{Role, RoleRegistry};
pub use user::{AnonymousUser, User};
