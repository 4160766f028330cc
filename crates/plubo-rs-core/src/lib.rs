//! # plubo-rs-core
//!
//! Core types, settings, and error types for the plubo-rs routing layer.
//! This crate has no dependency on the rest of the framework and provides the
//! foundation every other crate builds on.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Router settings and global configuration
//! - [`settings_loader`] - Loading settings from TOML/JSON and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`args`] - The ordered argument map handed to resolvers and hooks
//! - [`resolvable`] - Literal-or-resolver values
//! - [`cache`] - The host key-value store contract and an in-memory store

pub mod args;
pub mod cache;
pub mod error;
pub mod logging;
pub mod resolvable;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use args::ArgumentMap;
pub use error::{PluboError, PluboResult, ValidationError, Violation};
pub use resolvable::Resolvable;
pub use settings::{AccessMode, Settings, SETTINGS};
