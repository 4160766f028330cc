//! The ordered argument map handed to resolvers, hooks and permission checks.
//!
//! Keys keep insertion order: for a compiled route this is the left-to-right
//! placeholder order followed by the route's extra static variables. A value
//! is `None` when neither the host nor the route configuration supplied one.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// An insertion-ordered map from argument name to raw string value.
///
/// # Examples
///
/// ```
/// use plubo_rs_core::ArgumentMap;
///
/// let mut args = ArgumentMap::new();
/// args.insert("client_id", Some("42".to_string()));
/// args.insert("tab", None);
///
/// assert_eq!(args.get("client_id"), Some("42"));
/// assert_eq!(args.get("tab"), None);
/// assert!(args.contains_key("tab"));
/// assert_eq!(args.keys().collect::<Vec<_>>(), vec!["client_id", "tab"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentMap {
    entries: Vec<(String, Option<String>)>,
}

impl ArgumentMap {
    /// Creates an empty argument map.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts or replaces a value, keeping the original position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Returns the value for `key`, or `None` if it is absent or unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Returns `true` if `key` is present, even with an unset value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts the map into a JSON object (`null` for unset values).
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(k, v)| {
                let value = v
                    .as_ref()
                    .map_or(serde_json::Value::Null, |s| serde_json::Value::String(s.clone()));
                (k.clone(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for ArgumentMap {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for ArgumentMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order() {
        let mut args = ArgumentMap::new();
        args.insert("b", Some("2".into()));
        args.insert("a", Some("1".into()));
        args.insert("b", Some("3".into()));
        assert_eq!(args.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(args.get("b"), Some("3"));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_unset_values() {
        let args: ArgumentMap = vec![("slug", None)].into_iter().collect();
        assert!(args.contains_key("slug"));
        assert_eq!(args.get("slug"), None);
        assert_eq!(args.get("missing"), None);
        assert!(!args.contains_key("missing"));
    }

    #[test]
    fn test_to_json() {
        let args: ArgumentMap = vec![("id", Some("7".to_string())), ("tab", None)]
            .into_iter()
            .collect();
        assert_eq!(args.to_json(), serde_json::json!({"id": "7", "tab": null}));
        assert_eq!(
            serde_json::to_string(&args).unwrap(),
            r#"{"id":"7","tab":null}"#
        );
    }

    #[test]
    fn test_empty() {
        let args = ArgumentMap::new();
        assert!(args.is_empty());
        assert_eq!(args.iter().count(), 0);
    }
}
