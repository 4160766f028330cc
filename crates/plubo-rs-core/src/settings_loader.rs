//! Reading [`Settings`] from configuration files and `PLUBO_*` variables.
//!
//! Files may be TOML or JSON; the format is picked from the extension. Keys
//! missing from a file keep their defaults, and environment variables are
//! applied last:
//!
//! | Variable | Field |
//! |---|---|
//! | `PLUBO_DEBUG` | `debug` |
//! | `PLUBO_LOG_LEVEL` | `log_level` |
//! | `PLUBO_ROUTE_VARIABLE` | `route_variable` |
//! | `PLUBO_HOME_URL` | `home_url` |
//! | `PLUBO_ACCESS_MODE` | `access_mode` |
//! | `PLUBO_DEFAULT_REDIRECT_STATUS` | `default_redirect_status` |
//! | `PLUBO_TEMPLATE_TEMP_DIR` | `template_temp_dir` |
//!
//! ```rust,no_run
//! use plubo_rs_core::settings_loader;
//!
//! let settings = settings_loader::load("config/routes.toml").unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::error::PluboError;
use crate::settings::{AccessMode, Settings};

/// Configuration file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Toml,
    Json,
}

impl SettingsFormat {
    /// Guesses the format from a file extension. Anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// Parses settings text in the given format.
///
/// # Errors
///
/// [`PluboError::ConfigurationError`] when the text is not valid for
/// `format` or a field has the wrong type.
pub fn parse(text: &str, format: SettingsFormat) -> Result<Settings, PluboError> {
    let parsed = match format {
        SettingsFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        SettingsFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|reason| {
        PluboError::ConfigurationError(format!("invalid {} settings: {reason}", format.label()))
    })
}

/// Parses TOML settings.
pub fn from_toml_str(text: &str) -> Result<Settings, PluboError> {
    parse(text, SettingsFormat::Toml)
}

/// Parses JSON settings.
pub fn from_json_str(text: &str) -> Result<Settings, PluboError> {
    parse(text, SettingsFormat::Json)
}

/// Reads a settings file without looking at the environment.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse.
pub fn from_file(path: impl AsRef<Path>) -> Result<Settings, PluboError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        PluboError::ConfigurationError(format!("cannot read {}: {e}", path.display()))
    })?;
    parse(&text, SettingsFormat::from_path(path))
}

/// Reads a settings file, then applies `PLUBO_*` overrides.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse.
pub fn load(path: impl AsRef<Path>) -> Result<Settings, PluboError> {
    let mut settings = from_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults plus `PLUBO_*` overrides.
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies every `PLUBO_*` variable present in the process environment.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

type Override = fn(&mut Settings, &str) -> Result<(), ()>;

const OVERRIDES: &[(&str, Override)] = &[
    ("PLUBO_DEBUG", |s, v| {
        s.debug = matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on");
        Ok(())
    }),
    ("PLUBO_LOG_LEVEL", |s, v| {
        s.log_level = v.to_string();
        Ok(())
    }),
    ("PLUBO_ROUTE_VARIABLE", |s, v| {
        s.route_variable = v.to_string();
        Ok(())
    }),
    ("PLUBO_HOME_URL", |s, v| {
        s.home_url = v.to_string();
        Ok(())
    }),
    ("PLUBO_ACCESS_MODE", |s, v| {
        s.access_mode = access_mode(v).ok_or(())?;
        Ok(())
    }),
    ("PLUBO_DEFAULT_REDIRECT_STATUS", |s, v| {
        s.default_redirect_status = v.trim().parse().map_err(|_| ())?;
        Ok(())
    }),
    ("PLUBO_TEMPLATE_TEMP_DIR", |s, v| {
        s.template_temp_dir = Some(PathBuf::from(v));
        Ok(())
    }),
];

/// Applies overrides from `lookup`. Values that do not parse are logged and
/// leave the field untouched.
fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for (name, apply) in OVERRIDES {
        let Some(value) = lookup(name) else { continue };
        if apply(settings, &value).is_err() {
            tracing::warn!(variable = *name, value = %value, "ignoring unusable settings override");
        }
    }
}

fn access_mode(value: &str) -> Option<AccessMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "public" => Some(AccessMode::Public),
        "private" | "private_only" => Some(AccessMode::PrivateOnly),
        "rules" | "guest_and_member_rules" => Some(AccessMode::GuestAndMemberRules),
        _ => None,
    }
}
