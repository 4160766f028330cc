//! HTTP basic authentication for template routes.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::StatusCode;

use plubo_rs_http::HttpResponse;

/// A user-to-password credential map guarding a route.
///
/// # Examples
///
/// ```
/// use plubo_rs_auth::BasicAuth;
///
/// let auth = BasicAuth::new([("editor", "s3cret")]);
/// assert!(auth.verify(Some("Basic ZWRpdG9yOnMzY3JldA==")));
/// assert!(!auth.verify(None));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicAuth {
    credentials: BTreeMap<String, String>,
    realm: String,
}

impl BasicAuth {
    /// Default realm announced in the challenge.
    pub const DEFAULT_REALM: &'static str = "Restricted";

    /// Creates a credential map.
    pub fn new<I, U, P>(credentials: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            credentials: credentials
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
            realm: Self::DEFAULT_REALM.to_string(),
        }
    }

    /// Sets the realm.
    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Returns `true` if no credentials are configured, which disables the check.
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Returns the configured user names.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.credentials.keys().map(String::as_str)
    }

    /// Checks an `Authorization` header value against the credential map.
    ///
    /// Empty user names or passwords never match.
    pub fn verify(&self, authorization: Option<&str>) -> bool {
        let Some((user, password)) = authorization.and_then(parse_basic) else {
            return false;
        };
        if user.is_empty() || password.is_empty() {
            return false;
        }
        self.credentials.get(&user).is_some_and(|expected| *expected == password)
    }

    /// The 401 response sent when verification fails.
    pub fn challenge(&self) -> HttpResponse {
        let mut response =
            HttpResponse::new(StatusCode::UNAUTHORIZED, "Unauthorized Access").no_cache();
        response.insert_header(
            "www-authenticate",
            &format!("Basic realm=\"{}\"", self.realm.replace('"', "")),
        );
        response
    }
}

/// Decodes `Basic <base64(user:password)>`.
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.trim().to_string(), password.trim().to_string()))
}
