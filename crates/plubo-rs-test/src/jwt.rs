//! HS256 token encoding for exercising [`JwtMiddleware`](plubo_rs_middleware::builtin::JwtMiddleware).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;

/// Current Unix time in seconds.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Encodes `claims` as a compact HS256 token signed with `secret`.
///
/// # Examples
///
/// ```
/// use plubo_rs_middleware::builtin::JwtMiddleware;
/// use plubo_rs_test::{encode_hs256, now};
///
/// let token = encode_hs256("s3cret", &serde_json::json!({ "sub": "7", "exp": now() + 60 }));
/// let claims = JwtMiddleware::new("s3cret").validate(&token).unwrap();
/// assert_eq!(claims["sub"], "7");
/// ```
pub fn encode_hs256(secret: &str, claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "HS256", "typ": "JWT" }).to_string());
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signing_input = format!("{header}.{payload}");

    // HMAC accepts keys of any length
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return signing_input;
    };
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{signing_input}.{signature}")
}

/// An `Authorization` header value carrying an HS256 token.
pub fn bearer(secret: &str, claims: &Value) -> String {
    format!("Bearer {}", encode_hs256(secret, claims))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = encode_hs256("k", &json!({ "sub": "1" }));
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(!token.contains('='));
        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&payload).unwrap(), json!({ "sub": "1" }));
    }

    #[test]
    fn test_bearer_prefix() {
        assert!(bearer("k", &json!({})).starts_with("Bearer "));
    }
}
