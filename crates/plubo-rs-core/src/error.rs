//! Errors raised while compiling and dispatching routes.
//!
//! Every [`PluboError`] has an HTTP status ([`PluboError::status_code`]) and
//! renders as the `{"code", "message", "data": {"status"}}` payload REST
//! clients receive ([`PluboError::to_payload`]).

use std::fmt;

use serde_json::{json, Value};
use thiserror::Error;

/// One rejected request parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted property path (`address.zip`, `ids[1]`), `$` for the root.
    pub property: String,
    /// Schema keyword that failed, e.g. `required` or `minimum`.
    pub code: String,
    pub message: String,
}

/// Everything a schema check found wrong with a set of parameters.
///
/// ```
/// use plubo_rs_core::ValidationError;
///
/// let mut errors = ValidationError::default();
/// errors.push("email", "format", "Invalid email");
/// assert_eq!(errors.details(), vec!["[email] Invalid email"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    /// Records a violation of `code` at `property`.
    pub fn push(
        &mut self,
        property: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.violations.push(Violation {
            property: property.into(),
            code: code.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// `"[property] message"` lines in the order they were found.
    pub fn details(&self) -> Vec<String> {
        self.violations
            .iter()
            .map(|v| format!("[{}] {}", v.property, v.message))
            .collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.details().join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Failure anywhere in the routing layer.
///
/// Request-level variants carry the message shown to the client. The rest
/// are deployment problems and surface as 500.
#[derive(Error, Debug)]
pub enum PluboError {
    /// Malformed input or credentials.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or expired credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Credentials are valid but not sufficient.
    #[error("Forbidden: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Invalid parameters: {0}")]
    ValidationFailed(ValidationError),

    /// Settings could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A route, endpoint or placeholder declaration is unusable, or the
    /// dispatcher was driven out of order.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// The matched route has no template that can be served.
    #[error("Template error: {0}")]
    TemplateError(String),

    /// The key-value store returned something unexpected.
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PluboError {
    /// The HTTP status this error is reported with.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::ValidationFailed(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::TooManyRequests(_) => 429,
            Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::TemplateError(_)
            | Self::StoreError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// The message without the `Display` prefix.
    pub fn message(&self) -> String {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::PermissionDenied(m)
            | Self::NotFound(m)
            | Self::TooManyRequests(m)
            | Self::ConfigurationError(m)
            | Self::ImproperlyConfigured(m)
            | Self::TemplateError(m)
            | Self::StoreError(m) => m.clone(),
            Self::ValidationFailed(errors) => errors.to_string(),
            Self::IoError(e) => e.to_string(),
        }
    }

    /// The REST error body under `code`. Validation failures add
    /// `data.details`.
    pub fn to_payload(&self, code: &str) -> Value {
        let mut data = json!({ "status": self.status_code() });
        if let Self::ValidationFailed(errors) = self {
            data["details"] = json!(errors.details());
        }
        json!({ "code": code, "message": self.message(), "data": data })
    }
}

impl From<ValidationError> for PluboError {
    fn from(errors: ValidationError) -> Self {
        Self::ValidationFailed(errors)
    }
}

pub type PluboResult<T> = Result<T, PluboError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violations_keep_discovery_order() {
        let mut errors = ValidationError::default();
        assert!(errors.is_empty());
        errors.push("quantity", "type", "Must be an integer");
        errors.push("address.zip", "pattern", "Does not match ^[0-9]{5}$");
        assert_eq!(
            errors.details(),
            vec!["[quantity] Must be an integer", "[address.zip] Does not match ^[0-9]{5}$"]
        );
        assert_eq!(errors.violations()[1].code, "pattern");
        assert_eq!(
            errors.to_string(),
            "[quantity] Must be an integer; [address.zip] Does not match ^[0-9]{5}$"
        );
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (PluboError::BadRequest(String::new()), 400),
            (PluboError::Unauthorized(String::new()), 401),
            (PluboError::PermissionDenied(String::new()), 403),
            (PluboError::NotFound(String::new()), 404),
            (PluboError::TooManyRequests(String::new()), 429),
            (PluboError::ValidationFailed(ValidationError::default()), 400),
            (PluboError::TemplateError(String::new()), 500),
            (PluboError::StoreError(String::new()), 500),
        ];
        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{error:?}");
        }
    }

    #[test]
    fn test_message_drops_prefix() {
        let error = PluboError::NotFound("route client".into());
        assert_eq!(error.to_string(), "Not found: route client");
        assert_eq!(error.message(), "route client");
    }

    #[test]
    fn test_payload() {
        let payload = PluboError::Unauthorized("Token has expired".into())
            .to_payload("jwt_validation_error");
        assert_eq!(
            payload,
            json!({
                "code": "jwt_validation_error",
                "message": "Token has expired",
                "data": {"status": 401}
            })
        );
    }

    #[test]
    fn test_payload_lists_violations() {
        let mut errors = ValidationError::default();
        errors.push("email", "format", "Invalid email");
        let payload = PluboError::from(errors).to_payload("rest_invalid_param");
        assert_eq!(payload["data"]["status"], 400);
        assert_eq!(payload["data"]["details"][0], "[email] Invalid email");
    }

    #[test]
    fn test_io_errors_are_internal() {
        let error: PluboError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into();
        assert_eq!(error.status_code(), 500);
        assert!(error.message().contains("read-only"));
    }
}
