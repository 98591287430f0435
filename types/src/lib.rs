//! Core domain types for the App Center bindings.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer: the native bridges, the facades and
//! the settings loader.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod properties;
mod wrapper;

pub use properties::{
    CustomProperties, EventProperties, MAX_PROPERTIES, MAX_PROPERTY_KEY_LENGTH,
    MAX_PROPERTY_VALUE_LENGTH, PropertyChange, PropertyError, PropertyValue,
};
pub use wrapper::WrapperSdk;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Platform
// ============================================================================

/// Target platform of the native SDK, fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Uwp,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown platform identifier: {0}")]
pub struct UnknownPlatform(pub String);

impl Platform {
    /// The platform this crate was compiled for, if the native SDK supports it.
    #[must_use]
    pub const fn current() -> Option<Self> {
        if cfg!(target_os = "ios") {
            Some(Self::Ios)
        } else if cfg!(target_os = "android") {
            Some(Self::Android)
        } else if cfg!(target_vendor = "uwp") {
            Some(Self::Uwp)
        } else {
            None
        }
    }

    /// Identifier used as the key in `platform=secret` app secret strings.
    #[must_use]
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Uwp => "uwp",
        }
    }

    #[must_use]
    pub fn all() -> &'static [Platform] {
        &[Platform::Ios, Platform::Android, Platform::Uwp]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            "uwp" => Ok(Self::Uwp),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

// ============================================================================
// Log level
// ============================================================================

/// Native SDK console verbosity.
///
/// Discriminants are the integer values the native SDKs exchange (Android log
/// priorities, with `None` disabling output entirely).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Verbose = 2,
    Debug = 3,
    Info = 4,
    #[default]
    Warn = 5,
    Error = 6,
    Assert = 7,
    None = 99,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogLevelError {
    #[error("unknown log level value {0}")]
    UnknownValue(i32),
    #[error("unknown log level name {0:?}")]
    UnknownName(String),
}

impl LogLevel {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Assert => "assert",
            Self::None => "none",
        }
    }
}

impl TryFrom<i32> for LogLevel {
    type Error = LogLevelError;

    fn try_from(value: i32) -> Result<Self, LogLevelError> {
        match value {
            2 => Ok(LogLevel::Verbose),
            3 => Ok(LogLevel::Debug),
            4 => Ok(LogLevel::Info),
            5 => Ok(LogLevel::Warn),
            6 => Ok(LogLevel::Error),
            7 => Ok(LogLevel::Assert),
            99 => Ok(LogLevel::None),
            other => Err(LogLevelError::UnknownValue(other)),
        }
    }
}

impl FromStr for LogLevel {
    type Err = LogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbose" => Ok(Self::Verbose),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "assert" => Ok(Self::Assert),
            "none" => Ok(Self::None),
            _ => Err(LogLevelError::UnknownName(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Services
// ============================================================================

/// An App Center service that can be started alongside the core SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceId {
    Analytics,
    Crashes,
    Distribute,
    Push,
}

impl ServiceId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::Crashes => "crashes",
            Self::Distribute => "distribute",
            Self::Push => "push",
        }
    }

    #[must_use]
    pub fn all() -> &'static [ServiceId] {
        &[
            ServiceId::Analytics,
            ServiceId::Crashes,
            ServiceId::Distribute,
            ServiceId::Push,
        ]
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Start options
// ============================================================================

/// Validated inputs for starting the SDK, typically produced from a settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOptions {
    /// App secret, either bare or as `platform=secret;...` pairs.
    pub app_secret: String,
    pub log_level: LogLevel,
    pub log_url: Option<String>,
    pub user_id: Option<String>,
    pub services: Vec<ServiceId>,
}

impl StartOptions {
    #[must_use]
    pub fn new(app_secret: impl Into<String>) -> Self {
        Self {
            app_secret: app_secret.into(),
            log_level: LogLevel::default(),
            log_url: None,
            user_id: None,
            services: vec![ServiceId::Analytics],
        }
    }
}
