//! Core SDK facade.

use std::sync::Arc;

use appcenter_types::{CustomProperties, LogLevel, ServiceId, StartOptions, WrapperSdk};
use uuid::Uuid;

use crate::bridge::{NativeBridge, NativeService, NativeTask};
use crate::error::{BridgeError, StartError};
use crate::registry::{PrepareFn, ServiceRegistry};
use crate::secret::secret_for_platform;

/// Entry point for the core App Center SDK.
///
/// Cheap to clone; every clone talks to the same native bridge.
#[derive(Clone)]
pub struct AppCenter {
    bridge: Arc<dyn NativeBridge>,
}

impl std::fmt::Debug for AppCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCenter")
            .field("platform", &self.bridge.platform())
            .finish_non_exhaustive()
    }
}

impl AppCenter {
    #[must_use]
    pub fn new(bridge: Arc<dyn NativeBridge>) -> Self {
        Self { bridge }
    }

    /// Facade over the build target's native SDK.
    pub fn for_platform() -> Result<Self, BridgeError> {
        Ok(Self::new(crate::bridge::platform_bridge()?))
    }

    #[must_use]
    pub fn bridge(&self) -> &Arc<dyn NativeBridge> {
        &self.bridge
    }

    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.bridge.log_level()
    }

    pub fn set_log_level(&self, level: LogLevel) {
        tracing::debug!(operation = "set_log_level", level = %level, "Forwarding to native SDK");
        self.bridge.set_log_level(level);
    }

    pub fn set_log_url(&self, url: &str) {
        tracing::debug!(operation = "set_log_url", url, "Forwarding to native SDK");
        self.bridge.set_log_url(url);
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.bridge.is_configured()
    }

    pub fn set_enabled(&self, enabled: bool) -> NativeTask<()> {
        tracing::debug!(operation = "set_enabled", enabled, "Forwarding to native SDK");
        self.bridge.set_enabled(enabled)
    }

    pub fn is_enabled(&self) -> NativeTask<bool> {
        self.bridge.is_enabled()
    }

    /// Install identifier of this device.
    ///
    /// Completes with `None` when the SDK reports no identifier or an empty one.
    pub fn install_id(&self) -> NativeTask<Option<Uuid>> {
        self.bridge
            .install_id()
            .map(|raw| raw.and_then(parse_install_id))
    }

    pub fn set_user_id(&self, user_id: &str) {
        tracing::debug!(operation = "set_user_id", "Forwarding to native SDK");
        self.bridge.set_user_id(user_id);
    }

    pub fn set_custom_properties(&self, properties: &CustomProperties) {
        tracing::debug!(
            operation = "set_custom_properties",
            count = properties.len(),
            "Forwarding to native SDK"
        );
        self.bridge.set_custom_properties(properties);
    }

    pub fn set_wrapper_sdk(&self, sdk: &WrapperSdk) {
        self.bridge.set_wrapper_sdk(sdk);
    }

    /// Secret for the bridge's platform out of a `platform=secret;...` string.
    #[must_use]
    pub fn get_secret_for_platform(&self, secrets: Option<&str>) -> Option<String> {
        secret_for_platform(self.bridge.platform(), secrets)
    }

    /// Configure the SDK without starting services.
    pub fn configure(&self, app_secret: &str) -> Result<(), StartError> {
        let secret = self.platform_secret(app_secret)?;
        self.bridge.set_wrapper_sdk(&WrapperSdk::current());
        self.bridge.configure(&secret);
        Ok(())
    }

    /// Configure the SDK and start `services`.
    pub fn start(
        &self,
        app_secret: &str,
        services: &[ServiceId],
        registry: &ServiceRegistry,
    ) -> Result<(), StartError> {
        let (secret, resolved) = self.validate_start(app_secret, services, registry)?;
        self.launch(&secret, services, resolved);
        Ok(())
    }

    /// Start more services on an already configured SDK.
    pub fn start_services(
        &self,
        services: &[ServiceId],
        registry: &ServiceRegistry,
    ) -> Result<(), StartError> {
        let resolved = registry.resolve(services, self.bridge.platform())?;
        let native = self.run_prepare(resolved);
        if !self.bridge.is_configured() {
            tracing::warn!("Starting services before App Center is configured");
        }
        tracing::debug!(operation = "start_services", services = ?services, "Starting services");
        self.bridge.start_services(&native);
        Ok(())
    }

    /// Apply `options` and start the services they list.
    ///
    /// Nothing reaches the SDK unless the secret and every service are valid.
    pub fn start_with_settings(
        &self,
        options: &StartOptions,
        registry: &ServiceRegistry,
    ) -> Result<(), StartError> {
        let (secret, resolved) =
            self.validate_start(&options.app_secret, &options.services, registry)?;
        self.set_log_level(options.log_level);
        if let Some(url) = &options.log_url {
            self.set_log_url(url);
        }
        self.launch(&secret, &options.services, resolved);
        if let Some(user_id) = &options.user_id {
            self.set_user_id(user_id);
        }
        Ok(())
    }

    fn validate_start(
        &self,
        app_secret: &str,
        services: &[ServiceId],
        registry: &ServiceRegistry,
    ) -> Result<(String, Vec<(NativeService, Option<PrepareFn>)>), StartError> {
        let secret = self.platform_secret(app_secret)?;
        let resolved = registry.resolve(services, self.bridge.platform())?;
        Ok((secret, resolved))
    }

    fn launch(
        &self,
        secret: &str,
        services: &[ServiceId],
        resolved: Vec<(NativeService, Option<PrepareFn>)>,
    ) {
        let native = self.run_prepare(resolved);
        self.bridge.set_wrapper_sdk(&WrapperSdk::current());
        tracing::debug!(operation = "start", services = ?services, "Starting App Center");
        self.bridge.start(secret, &native);
    }

    fn platform_secret(&self, app_secret: &str) -> Result<String, StartError> {
        match self.get_secret_for_platform(Some(app_secret)) {
            Some(secret) if !secret.trim().is_empty() => Ok(secret),
            _ => Err(StartError::MissingAppSecret),
        }
    }

    fn run_prepare(&self, resolved: Vec<(NativeService, Option<PrepareFn>)>) -> Vec<NativeService> {
        let mut native = Vec::with_capacity(resolved.len());
        for (service, prepare) in resolved {
            if let Some(prepare) = prepare {
                prepare(self.bridge.as_ref());
            }
            native.push(service);
        }
        native
    }
}

fn parse_install_id(raw: Option<String>) -> Result<Option<Uuid>, BridgeError> {
    let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };
    Uuid::parse_str(raw.trim())
        .map(Some)
        .map_err(|err| BridgeError::MalformedInstallId {
            value: raw,
            reason: err.to_string(),
        })
}
