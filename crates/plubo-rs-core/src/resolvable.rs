//! Values that are either fixed at declaration time or computed per request.
//!
//! Templates, redirect destinations, action identifiers, role lists and
//! capability lists can all be given as a literal or as a closure over the
//! request's [`ArgumentMap`]. The closure is only invoked at the single call
//! site that needs the value.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::args::ArgumentMap;

/// The function type behind [`Resolvable::Resolver`].
pub type ResolverFn<T> = Arc<dyn Fn(&ArgumentMap) -> T + Send + Sync>;

/// A literal value or a resolver computing it from the request arguments.
///
/// # Examples
///
/// ```
/// use plubo_rs_core::{ArgumentMap, Resolvable};
///
/// let fixed: Resolvable<String> = "clients".into();
/// let dynamic = Resolvable::resolver(|args: &ArgumentMap| {
///     format!("client-{}", args.get("id").unwrap_or("none"))
/// });
///
/// let mut args = ArgumentMap::new();
/// args.insert("id", Some("42".to_string()));
/// assert_eq!(fixed.resolve(&args), "clients");
/// assert_eq!(dynamic.resolve(&args), "client-42");
/// ```
pub enum Resolvable<T> {
    /// A value fixed at declaration time.
    Literal(T),
    /// A function of the request arguments.
    Resolver(ResolverFn<T>),
}

impl<T> Resolvable<T> {
    /// Wraps a closure as a resolver.
    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&ArgumentMap) -> T + Send + Sync + 'static,
    {
        Self::Resolver(Arc::new(f))
    }

    /// Returns `true` for the resolver variant.
    pub const fn is_resolver(&self) -> bool {
        matches!(self, Self::Resolver(_))
    }

    /// Returns the literal value, if any.
    pub const fn as_literal(&self) -> Option<&T> {
        match self {
            Self::Literal(v) => Some(v),
            Self::Resolver(_) => None,
        }
    }
}

impl<T: Clone> Resolvable<T> {
    /// Produces the value for the given request arguments.
    pub fn resolve(&self, args: &ArgumentMap) -> T {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Resolver(f) => f(args),
        }
    }
}

impl<T: Serialize> Resolvable<T> {
    /// A stable JSON description used for change detection.
    ///
    /// Resolvers cannot be inspected, so they all fingerprint to the same marker.
    pub fn fingerprint(&self) -> serde_json::Value {
        match self {
            Self::Literal(v) => serde_json::to_value(v).unwrap_or(serde_json::Value::Null),
            Self::Resolver(_) => serde_json::Value::String("<resolver>".to_string()),
        }
    }
}

impl<T: Clone> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Literal(v) => Self::Literal(v.clone()),
            Self::Resolver(f) => Self::Resolver(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl<T: Default> Default for Resolvable<T> {
    fn default() -> Self {
        Self::Literal(T::default())
    }
}

impl<T> From<T> for Resolvable<T> {
    fn from(value: T) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for Resolvable<String> {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<&[&str]> for Resolvable<Vec<String>> {
    fn from(values: &[&str]) -> Self {
        Self::Literal(values.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Resolvable<Vec<String>> {
    fn from(values: [&str; N]) -> Self {
        Self::Literal(values.iter().map(|s| (*s).to_string()).collect())
    }
}
