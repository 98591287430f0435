use std::sync::Arc;

use appcenter_core::{AnalyticsBridge, ConfiguratorChange, NativeHandle, NativeTask};
use appcenter_types::EventProperties;

/// Named routing destination for events, held by the native SDK.
#[derive(Clone)]
pub struct TransmissionTarget {
    bridge: Arc<dyn AnalyticsBridge>,
    handle: NativeHandle,
    token: String,
}

impl std::fmt::Debug for TransmissionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransmissionTarget")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl TransmissionTarget {
    pub(crate) fn new(
        bridge: Arc<dyn AnalyticsBridge>,
        handle: NativeHandle,
        token: impl Into<String>,
    ) -> Self {
        Self {
            bridge,
            handle,
            token: token.into(),
        }
    }

    #[must_use]
    pub fn handle(&self) -> &NativeHandle {
        &self.handle
    }

    /// Tenant token this target was created with.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn track_event(&self, name: &str) {
        tracing::debug!(operation = "track_event", event = name, "Forwarding to transmission target");
        self.bridge.track_event(Some(&self.handle), name, None);
    }

    pub fn track_event_with_properties(&self, name: &str, properties: &EventProperties) {
        tracing::debug!(
            operation = "track_event",
            event = name,
            properties = properties.len(),
            "Forwarding to transmission target"
        );
        self.bridge
            .track_event(Some(&self.handle), name, Some(properties));
    }

    /// Whether this target, all of its parents and Analytics are enabled.
    pub fn is_enabled(&self) -> NativeTask<bool> {
        self.bridge.is_target_enabled(Some(&self.handle))
    }

    pub fn set_enabled(&self, enabled: bool) -> NativeTask<()> {
        self.bridge.set_target_enabled(Some(&self.handle), enabled)
    }

    /// Child target nested under this one.
    #[must_use]
    pub fn transmission_target(&self, token: &str) -> Option<Self> {
        let handle = self.bridge.transmission_target(Some(&self.handle), token);
        if handle.is_none() {
            tracing::warn!(token, "Native SDK returned no child transmission target");
        }
        handle.map(|handle| Self::new(Arc::clone(&self.bridge), handle, token))
    }

    #[must_use]
    pub fn property_configurator(&self) -> Option<PropertyConfigurator> {
        let handle = self.bridge.property_configurator(&self.handle);
        if handle.is_none() {
            tracing::warn!(token = %self.token, "Native SDK returned no property configurator");
        }
        handle.map(|handle| PropertyConfigurator {
            bridge: Arc::clone(&self.bridge),
            handle,
        })
    }
}

/// Overrides app fields and attaches common properties to a target's events.
#[derive(Clone)]
pub struct PropertyConfigurator {
    bridge: Arc<dyn AnalyticsBridge>,
    handle: NativeHandle,
}

impl std::fmt::Debug for PropertyConfigurator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyConfigurator")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl PropertyConfigurator {
    fn apply(&self, change: ConfiguratorChange) -> &Self {
        self.bridge.configure_property(&self.handle, &change);
        self
    }

    pub fn set_app_name(&self, name: &str) -> &Self {
        self.apply(ConfiguratorChange::AppName(name.to_string()))
    }

    pub fn set_app_version(&self, version: &str) -> &Self {
        self.apply(ConfiguratorChange::AppVersion(version.to_string()))
    }

    pub fn set_app_locale(&self, locale: &str) -> &Self {
        self.apply(ConfiguratorChange::AppLocale(locale.to_string()))
    }

    /// Property added to every event tracked through the target and its children.
    pub fn set_event_property(&self, key: &str, value: &str) -> &Self {
        self.apply(ConfiguratorChange::SetEventProperty {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn remove_event_property(&self, key: &str) -> &Self {
        self.apply(ConfiguratorChange::RemoveEventProperty(key.to_string()))
    }
}
