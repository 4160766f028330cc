//! Settings for plubo-rs.
//!
//! This module provides the [`Settings`] struct, which holds the router
//! configuration, and [`LazySettings`], a globally-accessible,
//! lazily-initialized settings instance. Every value has a default so an empty
//! configuration file is valid.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Controls whether the guest/member gating of a route applies.
///
/// The gating rule itself is always the same (guests need `guest` access,
/// authenticated identities need `logged_in` access); this only decides when
/// it is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Guest/member gating is never evaluated.
    Public,
    /// Guest/member gating is evaluated only for routes flagged `private`.
    PrivateOnly,
    /// Guest/member gating is evaluated for every route.
    #[default]
    GuestAndMemberRules,
}

/// The complete set of router settings.
///
/// Use [`SETTINGS`] to access the global instance, or pass a `Settings`
/// explicitly to the components that need it.
///
/// # Examples
///
/// ```
/// use plubo_rs_core::settings::{AccessMode, Settings};
///
/// let settings = Settings::default();
/// assert_eq!(settings.route_variable, "route_name");
/// assert_eq!(settings.default_redirect_status, 301);
/// assert_eq!(settings.access_mode, AccessMode::GuestAndMemberRules);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ── Diagnostics ──────────────────────────────────────────────────

    /// Debug logging and verbose compile reports.
    pub debug: bool,
    /// The log level filter (e.g. "info", "plubo_rs_routes=debug").
    pub log_level: String,

    // ── Routing ──────────────────────────────────────────────────────

    /// Query variable carrying the route identifier in rewrite rules.
    pub route_variable: String,
    /// The front-controller script rewrite rules point at.
    pub index_base: String,
    /// Site root used to build internal redirect locations.
    pub home_url: String,
    /// Prefix of the hook fired when a template route matches.
    pub route_hook_prefix: String,

    // ── Access control ───────────────────────────────────────────────

    /// When guest/member gating applies.
    pub access_mode: AccessMode,
    /// Status used by redirect routes when none (or an invalid one) is configured.
    pub default_redirect_status: u16,
    /// Status emitted when access is denied and no redirect is configured.
    pub default_forbidden_status: u16,
    /// Status used when access is denied and a redirect is configured.
    pub default_forbidden_redirect_status: u16,

    // ── Change detection ─────────────────────────────────────────────

    /// Option name storing the content hash of the declared routes.
    pub routes_hash_option: String,
    /// Option name storing the content hash of the declared endpoints.
    pub endpoints_hash_option: String,

    // ── Inline templates ─────────────────────────────────────────────

    /// Directory for rendered inline templates (system temp dir when unset).
    pub template_temp_dir: Option<PathBuf>,
    /// Extension appended to rendered inline template files.
    pub inline_template_extension: String,

    // ── Other ────────────────────────────────────────────────────────

    /// Host- or middleware-specific values, e.g. `cache_ttl`.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),

            route_variable: "route_name".to_string(),
            index_base: "index.php".to_string(),
            home_url: "/".to_string(),
            route_hook_prefix: "plubo/route_".to_string(),

            access_mode: AccessMode::default(),
            default_redirect_status: 301,
            default_forbidden_status: 403,
            default_forbidden_redirect_status: 302,

            routes_hash_option: "plubo-routes-hash".to_string(),
            endpoints_hash_option: "plubo-endpoints-hash".to_string(),

            template_temp_dir: None,
            inline_template_extension: ".html".to_string(),

            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns the directory rendered inline templates are written to.
    pub fn template_dir(&self) -> PathBuf {
        self.template_temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("plubo-rs"))
    }
}

/// Settings installed once per process.
///
/// The host calls [`configure`](LazySettings::configure) while booting;
/// `Router::new` and similar constructors read it afterwards.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// An empty slot.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings.
    ///
    /// Returns the rejected settings if they were already configured.
    pub fn configure(&self, settings: Settings) -> Result<(), Settings> {
        self.inner.set(settings)
    }

    /// Returns the configured settings, or `None` before [`configure`](Self::configure).
    pub fn get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    /// Returns the configured settings, installing the defaults if none were set.
    pub fn get_or_default(&self) -> &Settings {
        self.inner.get_or_init(Settings::default)
    }

    /// Whether [`configure`](Self::configure) (or a defaulting read) already ran.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The process-wide settings. `Router::new` starts from these.
pub static SETTINGS: LazySettings = LazySettings::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.route_variable, "route_name");
        assert_eq!(s.index_base, "index.php");
        assert_eq!(s.home_url, "/");
        assert_eq!(s.default_redirect_status, 301);
        assert_eq!(s.default_forbidden_status, 403);
        assert_eq!(s.default_forbidden_redirect_status, 302);
        assert_eq!(s.routes_hash_option, "plubo-routes-hash");
        assert_eq!(s.endpoints_hash_option, "plubo-endpoints-hash");
        assert!(s.template_temp_dir.is_none());
    }

    #[test]
    fn test_template_dir_falls_back_to_temp() {
        let s = Settings::default();
        assert!(s.template_dir().ends_with("plubo-rs"));

        let s = Settings {
            template_temp_dir: Some(PathBuf::from("/var/cache/routes")),
            ..Settings::default()
        };
        assert_eq!(s.template_dir(), PathBuf::from("/var/cache/routes"));
    }

    #[test]
    fn test_access_mode_serde_names() {
        let json = serde_json::to_string(&AccessMode::PrivateOnly).unwrap();
        assert_eq!(json, "\"private_only\"");
        let mode: AccessMode = serde_json::from_str("\"public\"").unwrap();
        assert_eq!(mode, AccessMode::Public);
    }

    #[test]
    fn test_lazy_settings_configure_once() {
        let lazy = LazySettings::new();
        assert!(!lazy.is_configured());
        assert!(lazy.get().is_none());
        assert!(lazy.configure(Settings::default()).is_ok());
        assert!(lazy.is_configured());
        assert!(lazy.configure(Settings::default()).is_err());
    }

    #[test]
    fn test_lazy_settings_get_or_default() {
        let lazy = LazySettings::new();
        assert_eq!(lazy.get_or_default().route_variable, "route_name");
        assert!(lazy.is_configured());
    }

    #[test]
    fn test_settings_serialization_roundtrip() {
        let s = Settings::default();
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.route_variable, s.route_variable);
        assert_eq!(back.access_mode, s.access_mode);
    }
}
