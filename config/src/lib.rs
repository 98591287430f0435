//! Settings file for hosts and tools that start the SDK from configuration.
//!
//! ```toml
//! app_secret = "ios=${IOS_SECRET};android=${ANDROID_SECRET}"
//! log_level = "verbose"
//!
//! [services]
//! crashes = true
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use appcenter_types::{LogLevel, ServiceId, StartOptions};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "APPCENTER_CONFIG";

// Default value function for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

#[derive(Default, Deserialize)]
pub struct Settings {
    /// Bare secret or `platform=secret;...` pairs. `${VAR}` is expanded.
    pub app_secret: Option<String>,
    pub log_level: Option<String>,
    pub log_url: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub services: ServicesConfig,
}

// Manual Debug impl to prevent leaking the app secret in logs.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field(
                "app_secret",
                &if self.app_secret.is_some() { "[REDACTED]" } else { "None" },
            )
            .field("log_level", &self.log_level)
            .field("log_url", &self.log_url)
            .field("user_id", &self.user_id)
            .field("services", &self.services)
            .finish()
    }
}

/// Which services to start. Analytics is on unless disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_true")]
    pub analytics: bool,
    #[serde(default)]
    pub crashes: bool,
    #[serde(default)]
    pub distribute: bool,
    #[serde(default)]
    pub push: bool,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            analytics: true,
            crashes: false,
            distribute: false,
            push: false,
        }
    }
}

impl ServicesConfig {
    /// Enabled services in a stable order.
    #[must_use]
    pub fn enabled(&self) -> Vec<ServiceId> {
        ServiceId::all()
            .iter()
            .copied()
            .filter(|id| match id {
                ServiceId::Analytics => self.analytics,
                ServiceId::Crashes => self.crashes,
                ServiceId::Distribute => self.distribute,
                ServiceId::Push => self.push,
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid settings: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// File the error came from; `None` for validation errors.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid(_) => None,
        }
    }
}

/// Replace `${VAR}` with the variable's value; unset variables become empty.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        let Some(close) = rest[open + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let var = &rest[open + 2..open + 2 + close];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[open + 2 + close + 1..];
    }

    out.push_str(rest);
    out
}

fn expanded(value: Option<&String>) -> Option<String> {
    value
        .map(|value| expand_env_vars(value))
        .filter(|value| !value.trim().is_empty())
}

impl Settings {
    /// Load from [`config_path`]. `Ok(None)` when the file does not exist.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read settings at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match Self::from_toml_str(&content) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::warn!("Failed to parse settings at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Expand environment references and validate into [`StartOptions`].
    pub fn resolve(&self) -> Result<StartOptions, ConfigError> {
        let app_secret = expanded(self.app_secret.as_ref())
            .ok_or_else(|| ConfigError::Invalid("app_secret is missing or empty".to_string()))?;

        let log_level = match &self.log_level {
            Some(level) => level
                .parse::<LogLevel>()
                .map_err(|err| ConfigError::Invalid(err.to_string()))?,
            None => LogLevel::default(),
        };

        Ok(StartOptions {
            app_secret,
            log_level,
            log_url: expanded(self.log_url.as_ref()),
            user_id: expanded(self.user_id.as_ref()),
            services: self.services.enabled(),
        })
    }
}

/// Settings file location: `$APPCENTER_CONFIG`, else `~/.appcenter/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|path| !path.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".appcenter").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // expand_env_vars tests

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("ios=abc;android=def"), "ios=abc;android=def");
    }

    #[test]
    fn expand_env_vars_single_var() {
        unsafe {
            std::env::set_var("APPCENTER_TEST_SINGLE", "replaced");
        }
        let result = expand_env_vars("ios=${APPCENTER_TEST_SINGLE};");
        assert_eq!(result, "ios=replaced;");
        unsafe {
            std::env::remove_var("APPCENTER_TEST_SINGLE");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        unsafe {
            std::env::remove_var("APPCENTER_TEST_MISSING");
        }
        let result = expand_env_vars("before ${APPCENTER_TEST_MISSING} after");
        assert_eq!(result, "before  after");
    }

    #[test]
    fn expand_env_vars_adjacent_vars() {
        unsafe {
            std::env::set_var("APPCENTER_TEST_A", "X");
            std::env::set_var("APPCENTER_TEST_B", "Y");
        }
        assert_eq!(expand_env_vars("${APPCENTER_TEST_A}${APPCENTER_TEST_B}"), "XY");
        unsafe {
            std::env::remove_var("APPCENTER_TEST_A");
            std::env::remove_var("APPCENTER_TEST_B");
        }
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(expand_env_vars("test ${UNCLOSED"), "test ${UNCLOSED");
    }

    #[test]
    fn expand_env_vars_empty_var_name_removed() {
        assert_eq!(expand_env_vars("test ${} more"), "test  more");
    }

    // Settings tests

    #[test]
    fn parse_empty_settings_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert!(settings.app_secret.is_none());
        assert_eq!(settings.services, ServicesConfig::default());
        assert_eq!(settings.services.enabled(), vec![ServiceId::Analytics]);
    }

    #[test]
    fn parse_full_settings() {
        let settings = Settings::from_toml_str(
            r#"
app_secret = "ios=AAA;android=BBB"
log_level = "verbose"
log_url = "https://logs.example.com"
user_id = "player-7"

[services]
analytics = false
crashes = true
push = true
"#,
        )
        .unwrap();

        let options = settings.resolve().unwrap();
        assert_eq!(options.app_secret, "ios=AAA;android=BBB");
        assert_eq!(options.log_level, LogLevel::Verbose);
        assert_eq!(options.log_url.as_deref(), Some("https://logs.example.com"));
        assert_eq!(options.user_id.as_deref(), Some("player-7"));
        assert_eq!(options.services, vec![ServiceId::Crashes, ServiceId::Push]);
    }

    #[test]
    fn resolve_defaults_log_level_to_warn() {
        let settings = Settings::from_toml_str(r#"app_secret = "secret""#).unwrap();
        assert_eq!(settings.resolve().unwrap().log_level, LogLevel::Warn);
    }

    #[test]
    fn resolve_expands_secret_from_environment() {
        unsafe {
            std::env::set_var("APPCENTER_TEST_IOS_SECRET", "from-env");
        }
        let settings =
            Settings::from_toml_str(r#"app_secret = "ios=${APPCENTER_TEST_IOS_SECRET}""#).unwrap();
        assert_eq!(settings.resolve().unwrap().app_secret, "ios=from-env");
        unsafe {
            std::env::remove_var("APPCENTER_TEST_IOS_SECRET");
        }
    }

    #[test]
    fn resolve_rejects_empty_secret() {
        unsafe {
            std::env::remove_var("APPCENTER_TEST_UNSET_SECRET");
        }
        for content in ["", r#"app_secret = "  ""#, r#"app_secret = "${APPCENTER_TEST_UNSET_SECRET}""#] {
            let settings = Settings::from_toml_str(content).unwrap();
            let err = settings.resolve().unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{content:?}");
            assert!(err.path().is_none());
        }
    }

    #[test]
    fn resolve_rejects_unknown_log_level() {
        let settings = Settings::from_toml_str(
            r#"
app_secret = "secret"
log_level = "loud"
"#,
        )
        .unwrap();
        assert!(matches!(settings.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn debug_redacts_secret() {
        let settings = Settings::from_toml_str(r#"app_secret = "ios=very-secret""#).unwrap();
        let debug = format!("{settings:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("very-secret"));
    }

    // load_from tests

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "app_secret = \"secret\"\n[services]\ncrashes = true\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.app_secret.as_deref(), Some("secret"));
        assert!(settings.services.crashes);
    }

    #[test]
    fn load_from_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[test]
    fn load_from_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "app_secret = [").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
    }
}
