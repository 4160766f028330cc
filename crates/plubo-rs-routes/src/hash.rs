//! Content hashing for change detection.
//!
//! The declared route and endpoint sets are reduced to a JSON fingerprint and
//! hashed with SHA-256. `serde_json` objects are key-sorted, so equal
//! declarations always produce the same text and therefore the same hash.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of `text`.
pub fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Hashes a JSON fingerprint.
pub fn content_hash(fingerprint: &serde_json::Value) -> String {
    digest(&fingerprint.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_digest_is_sha256_hex() {
        assert_eq!(
            digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digest("client/{id:number}").len(), 64);
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a = json!({"path": "a", "name": "b"});
        let b = json!({"name": "b", "path": "a"});
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_sequence_order_matters() {
        let a = json!([{"path": "a"}, {"path": "b"}]);
        let b = json!([{"path": "b"}, {"path": "a"}]);
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
