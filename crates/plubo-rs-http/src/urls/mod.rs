//! URL path templates.
//!
//! Route and endpoint paths are written as templates such as
//! `clients/{client_id:number}/invoices/{invoice:uuid}`. This module turns
//! them into regular expressions the host's URL machinery can install:
//!
//! - [`vocabulary`]: the named placeholder types (`number`, `slug`, `uuid`, ...)
//! - [`compiler`]: template scanning and pattern generation in the two output
//!   modes (positional rewrite rules, named captures for REST routes)
//!
//! # Examples
//!
//! ```
//! use plubo_rs_http::urls::compiler::{compile, CompileMode};
//!
//! let compiled = compile("/client/{client_id:number}/", CompileMode::Rewrite);
//! assert_eq!(compiled.pattern(), "client/([0-9]+)");
//! assert_eq!(compiled.names().collect::<Vec<_>>(), vec!["client_id"]);
//!
//! let args = compiled.match_path("client/42").unwrap().unwrap();
//! assert_eq!(args.get("client_id"), Some("42"));
//! assert!(compiled.match_path("client/abc").unwrap().is_none());
//! ```

pub mod compiler;
pub mod vocabulary;
