//! HS256 bearer-token validation.
//!
//! The token is read from the `Authorization` header (`Bearer <token>`,
//! scheme matched case-insensitively), split into its three segments and
//! checked in order: encoding, JSON, algorithm, signature, then the
//! registered time claims (`exp`, `nbf`, `iat`) with leeway, then the
//! optional issuer and audience. The first failure ends the request with a
//! `jwt_validation_error` JSON payload.

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

use plubo_rs_core::{PluboError, PluboResult};
use plubo_rs_http::{HttpRequest, HttpResponse, JsonResponse};

use crate::chain::{Middleware, Next};

/// Request attribute holding the validated claims object.
pub const JWT_CLAIMS_ATTRIBUTE: &str = "jwt_claims";

const ERROR_CODE: &str = "jwt_validation_error";

/// Base64url that accepts segments with or without padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

type HmacSha256 = Hmac<Sha256>;

/// Validation parameters for [`JwtMiddleware`].
#[derive(Clone, Default)]
pub struct JwtConfig {
    /// Shared HMAC secret.
    pub secret: Vec<u8>,
    /// Required `iss` claim, if any.
    pub issuer: Option<String>,
    /// Required `aud` entry, if any.
    pub audience: Option<String>,
    /// Clock skew tolerated on `exp`, `nbf` and `iat`, in seconds.
    pub leeway: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway", &self.leeway)
            .finish()
    }
}

/// Rejects requests without a valid HS256 bearer token.
///
/// On success the claims are stored under [`JWT_CLAIMS_ATTRIBUTE`] and a
/// string or numeric `sub` claim becomes the request's user id.
///
/// # Examples
///
/// ```
/// use plubo_rs_middleware::builtin::JwtMiddleware;
///
/// let jwt = JwtMiddleware::new("s3cret")
///     .with_issuer("https://auth.example.com")
///     .with_audience("shop")
///     .with_leeway(30);
/// assert_eq!(jwt.config().leeway, 30);
/// ```
#[derive(Debug, Clone)]
pub struct JwtMiddleware {
    config: JwtConfig,
}

impl JwtMiddleware {
    /// Creates a validator for tokens signed with `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self::from_config(JwtConfig {
            secret: secret.as_ref().to_vec(),
            ..JwtConfig::default()
        })
    }

    /// Creates a validator from a full configuration. Negative leeway is treated as zero.
    pub fn from_config(mut config: JwtConfig) -> Self {
        if config.leeway < 0 {
            tracing::warn!(leeway = config.leeway, "negative JWT leeway replaced by zero");
            config.leeway = 0;
        }
        Self { config }
    }

    /// Requires the given issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.issuer = Some(issuer.into());
        self
    }

    /// Requires the given audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.config.audience = Some(audience.into());
        self
    }

    /// Sets the leeway in seconds.
    #[must_use]
    pub fn with_leeway(mut self, leeway: i64) -> Self {
        self.config.leeway = leeway.max(0);
        self
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Validates a raw token at the current time and returns its claims.
    pub fn validate(&self, token: &str) -> PluboResult<Map<String, Value>> {
        self.validate_at(token, chrono::Utc::now().timestamp())
    }

    /// Validates a raw token against the given Unix time and returns its claims.
    pub fn validate_at(&self, token: &str, now: i64) -> PluboResult<Map<String, Value>> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(PluboError::BadRequest("Invalid token format".into()));
        };

        let (Ok(header_bytes), Ok(payload_bytes)) =
            (URL_SAFE_LENIENT.decode(header), URL_SAFE_LENIENT.decode(payload))
        else {
            return Err(PluboError::BadRequest("Invalid token encoding".into()));
        };

        let (Ok(Value::Object(header_json)), Ok(Value::Object(claims))) = (
            serde_json::from_slice::<Value>(&header_bytes),
            serde_json::from_slice::<Value>(&payload_bytes),
        ) else {
            return Err(PluboError::BadRequest("Invalid JSON in token".into()));
        };

        if header_json.get("alg").and_then(Value::as_str) != Some("HS256") {
            return Err(PluboError::BadRequest("Unsupported token algorithm".into()));
        }

        self.verify_signature(&format!("{header}.{payload}"), signature)?;
        self.check_time_claims(&claims, now)?;
        self.check_issuer(&claims)?;
        self.check_audience(&claims)?;

        Ok(claims)
    }

    fn verify_signature(&self, signed: &str, signature: &str) -> PluboResult<()> {
        let denied = || PluboError::PermissionDenied("Signature verification failed".into());
        let expected = URL_SAFE_LENIENT.decode(signature).map_err(|_| denied())?;
        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| PluboError::ConfigurationError(format!("invalid JWT secret: {e}")))?;
        mac.update(signed.as_bytes());
        mac.verify_slice(&expected).map_err(|_| denied())
    }

    fn check_time_claims(&self, claims: &Map<String, Value>, now: i64) -> PluboResult<()> {
        let leeway = self.config.leeway;

        if let Some(exp) = numeric_claim(claims, "exp", "Invalid expiration claim")? {
            if exp.saturating_add(leeway) < now {
                return Err(PluboError::Unauthorized("Token has expired".into()));
            }
        }
        if let Some(nbf) = numeric_claim(claims, "nbf", "Invalid not before claim")? {
            if nbf.saturating_sub(leeway) > now {
                return Err(PluboError::Unauthorized("Token is not yet valid".into()));
            }
        }
        if let Some(iat) = numeric_claim(claims, "iat", "Invalid issued at claim")? {
            if iat.saturating_sub(leeway) > now {
                return Err(PluboError::BadRequest("Token was issued in the future".into()));
            }
        }
        Ok(())
    }

    fn check_issuer(&self, claims: &Map<String, Value>) -> PluboResult<()> {
        let Some(expected) = &self.config.issuer else {
            return Ok(());
        };
        match claims.get("iss").and_then(Value::as_str) {
            None => Err(PluboError::PermissionDenied(
                "Issuer claim missing or invalid".into(),
            )),
            Some(iss) if iss != expected => {
                Err(PluboError::PermissionDenied("Invalid issuer".into()))
            }
            Some(_) => Ok(()),
        }
    }

    fn check_audience(&self, claims: &Map<String, Value>) -> PluboResult<()> {
        let Some(expected) = &self.config.audience else {
            return Ok(());
        };
        let valid = match claims.get("aud") {
            None | Some(Value::Null) => {
                return Err(PluboError::PermissionDenied("Audience claim missing".into()));
            }
            Some(Value::String(aud)) => aud == expected,
            Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(expected)),
            Some(_) => false,
        };
        if valid {
            Ok(())
        } else {
            Err(PluboError::PermissionDenied("Invalid audience".into()))
        }
    }
}

/// Reads a time claim that may be a JSON number or a numeric string.
fn numeric_claim(
    claims: &Map<String, Value>,
    name: &str,
    invalid: &str,
) -> PluboResult<Option<i64>> {
    let parsed = match claims.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(f64_to_secs)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(f64_to_secs),
        Some(_) => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| PluboError::BadRequest(invalid.to_string()))
}

#[allow(clippy::cast_possible_truncation)]
fn f64_to_secs(value: f64) -> i64 {
    value.floor() as i64
}

/// Extracts the token following the first `Bearer` + whitespace in a header value.
fn bearer_token(header: &str) -> Option<&str> {
    let lower = header.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = lower[from..].find("bearer") {
        let start = from + pos + "bearer".len();
        let rest = &header[start..];
        if let Some(sep) = rest.chars().next().filter(|c| c.is_whitespace()) {
            let tail = &rest[sep.len_utf8()..];
            let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
            if end > 0 {
                return Some(&tail[..end]);
            }
        }
        from = start;
    }
    None
}

#[async_trait]
impl Middleware for JwtMiddleware {
    async fn handle(&self, mut request: HttpRequest, next: Next<'_>) -> HttpResponse {
        let Some(header) = request.header("authorization").map(str::to_owned) else {
            return reject(&PluboError::Unauthorized("Authorization token missing".into()));
        };
        let Some(token) = bearer_token(&header) else {
            return reject(&PluboError::BadRequest(
                "Invalid Authorization header format".into(),
            ));
        };

        let claims = match self.validate(token) {
            Ok(claims) => claims,
            Err(e) => return reject(&e),
        };

        match claims.get("sub") {
            Some(Value::String(sub)) => request.set_user_id(sub.clone()),
            Some(Value::Number(sub)) => request.set_user_id(sub.to_string()),
            _ => {}
        }
        request.set_attribute(JWT_CLAIMS_ATTRIBUTE, Value::Object(claims));
        next.run(request).await
    }

    fn name(&self) -> &'static str {
        "jwt"
    }
}

fn reject(error: &PluboError) -> HttpResponse {
    tracing::debug!(error = %error, "JWT rejected");
    JsonResponse::from_error(ERROR_CODE, error)
}
