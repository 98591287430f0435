//! Outbound interface to the platform-native App Center SDK.
//!
//! Each build target gets exactly one backing implementation, chosen at compile
//! time and exposed as [`PlatformBridge`]:
//!
//! | target            | backend                                  |
//! |-------------------|------------------------------------------|
//! | `ios`             | [`ios::IosBridge`], C calls into the Objective-C glue |
//! | `android`         | [`android::AndroidBridge`], JNI calls       |
//! | everything else   | [`SimulatedBridge`], in-process state      |
//!
//! The simulated backend is compiled everywhere so hosts and tests can use it
//! on mobile targets too.

#[cfg(target_os = "android")]
pub mod android;
#[cfg(target_os = "ios")]
pub mod ios;
mod simulated;

pub use simulated::{SimulatedBridge, SimulatedTarget, TrackedEvent};

use std::sync::Arc;

use appcenter_types::{
    CustomProperties, EventProperties, LogLevel, Platform, ServiceId, WrapperSdk,
};

use crate::error::BridgeError;
use crate::handle::NativeHandle;
use crate::task::AppCenterTask;

/// Task completed by the native layer with either a value or its failure.
pub type NativeTask<T> = AppCenterTask<Result<T, BridgeError>>;

/// A service class handed to the native SDK at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeService {
    pub id: ServiceId,
    pub class_name: &'static str,
}

/// Calls on the core App Center SDK.
pub trait NativeBridge: Send + Sync {
    /// Platform identifier used for app secret resolution.
    fn platform(&self) -> Option<Platform>;

    fn log_level(&self) -> LogLevel;
    fn set_log_level(&self, level: LogLevel);
    fn set_log_url(&self, url: &str);
    fn is_configured(&self) -> bool;

    /// Configure the SDK with an app secret without starting any service.
    fn configure(&self, app_secret: &str);
    fn start(&self, app_secret: &str, services: &[NativeService]);
    /// Start additional services on an already configured SDK.
    fn start_services(&self, services: &[NativeService]);

    fn set_enabled(&self, enabled: bool) -> NativeTask<()>;
    fn is_enabled(&self) -> NativeTask<bool>;
    /// Raw install identifier as reported by the SDK.
    fn install_id(&self) -> NativeTask<Option<String>>;

    fn set_user_id(&self, user_id: &str);
    fn set_custom_properties(&self, properties: &CustomProperties);
    fn set_wrapper_sdk(&self, sdk: &WrapperSdk);
}

/// Change applied through a transmission target's property configurator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfiguratorChange {
    AppName(String),
    AppVersion(String),
    AppLocale(String),
    SetEventProperty { key: String, value: String },
    RemoveEventProperty(String),
}

/// Calls on the Analytics service and its transmission targets.
///
/// A `target` of `None` addresses the Analytics service itself.
pub trait AnalyticsBridge: Send + Sync {
    fn track_event(
        &self,
        target: Option<&NativeHandle>,
        name: &str,
        properties: Option<&EventProperties>,
    );
    fn is_target_enabled(&self, target: Option<&NativeHandle>) -> NativeTask<bool>;
    fn set_target_enabled(&self, target: Option<&NativeHandle>, enabled: bool) -> NativeTask<()>;
    fn transmission_target(&self, parent: Option<&NativeHandle>, token: &str)
    -> Option<NativeHandle>;
    fn property_configurator(&self, target: &NativeHandle) -> Option<NativeHandle>;
    fn configure_property(&self, configurator: &NativeHandle, change: &ConfiguratorChange);
}

#[cfg(target_os = "ios")]
pub type PlatformBridge = ios::IosBridge;
#[cfg(target_os = "android")]
pub type PlatformBridge = android::AndroidBridge;
#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub type PlatformBridge = SimulatedBridge;

/// Return the native bridge for the current target.
///
/// On Android this fails until [`android::initialize`] has provided the JVM and
/// application context.
pub fn platform_bridge() -> Result<Arc<PlatformBridge>, BridgeError> {
    #[cfg(target_os = "ios")]
    {
        Ok(Arc::new(ios::IosBridge::new()))
    }
    #[cfg(target_os = "android")]
    {
        android::AndroidBridge::new().map(Arc::new)
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        Ok(Arc::new(SimulatedBridge::new()))
    }
}
