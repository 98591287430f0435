//! Analytics service for the App Center bindings.
//!
//! [`Analytics`] tracks events through the default channel; a
//! [`TransmissionTarget`] routes events to a separate tenant token and can be
//! nested. Event collection and delivery happen in the native SDK.

mod target;

pub use target::{PropertyConfigurator, TransmissionTarget};

use std::sync::Arc;

use appcenter_core::{
    AnalyticsBridge, BridgeError, NativeTask, ServiceDescriptor, ServiceRegistry,
};
use appcenter_types::{EventProperties, ServiceId};

/// Add the Analytics service to `registry` so it can be started.
pub fn register(registry: &mut ServiceRegistry) {
    registry.register(descriptor());
}

#[must_use]
pub const fn descriptor() -> ServiceDescriptor {
    ServiceDescriptor::new(ServiceId::Analytics)
}

/// Facade over the Analytics service of the native SDK.
#[derive(Clone)]
pub struct Analytics {
    bridge: Arc<dyn AnalyticsBridge>,
}

impl std::fmt::Debug for Analytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analytics").finish_non_exhaustive()
    }
}

impl Analytics {
    #[must_use]
    pub fn new(bridge: Arc<dyn AnalyticsBridge>) -> Self {
        Self { bridge }
    }

    /// Facade over the build target's native SDK.
    pub fn for_platform() -> Result<Self, BridgeError> {
        Ok(Self::new(appcenter_core::platform_bridge()?))
    }

    pub fn track_event(&self, name: &str) {
        tracing::debug!(operation = "track_event", event = name, "Forwarding to native SDK");
        self.bridge.track_event(None, name, None);
    }

    pub fn track_event_with_properties(&self, name: &str, properties: &EventProperties) {
        tracing::debug!(
            operation = "track_event",
            event = name,
            properties = properties.len(),
            "Forwarding to native SDK"
        );
        self.bridge.track_event(None, name, Some(properties));
    }

    pub fn is_enabled(&self) -> NativeTask<bool> {
        self.bridge.is_target_enabled(None)
    }

    pub fn set_enabled(&self, enabled: bool) -> NativeTask<()> {
        tracing::debug!(operation = "set_enabled", enabled, "Forwarding to native SDK");
        self.bridge.set_target_enabled(None, enabled)
    }

    /// Target routing events to the tenant identified by `token`.
    ///
    /// `None` when the native SDK refuses the token, for example before
    /// Analytics has started.
    #[must_use]
    pub fn transmission_target(&self, token: &str) -> Option<TransmissionTarget> {
        let handle = self.bridge.transmission_target(None, token);
        if handle.is_none() {
            tracing::warn!(token, "Native SDK returned no transmission target");
        }
        handle.map(|handle| TransmissionTarget::new(Arc::clone(&self.bridge), handle, token))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Analytics, register};
    use appcenter_core::{AppCenter, ServiceRegistry, SimulatedBridge};
    use appcenter_types::{EventProperties, ServiceId};

    fn started() -> (Arc<SimulatedBridge>, Analytics) {
        let bridge = Arc::new(SimulatedBridge::new());
        let mut registry = ServiceRegistry::new();
        register(&mut registry);
        AppCenter::new(bridge.clone())
            .start("secret", &[ServiceId::Analytics], &registry)
            .unwrap();
        (bridge.clone(), Analytics::new(bridge))
    }

    #[test]
    fn register_adds_analytics() {
        let mut registry = ServiceRegistry::new();
        register(&mut registry);
        assert!(registry.contains(ServiceId::Analytics));
        assert!(!registry.contains(ServiceId::Crashes));
    }

    #[test]
    fn tracks_events_with_properties() {
        let (bridge, analytics) = started();
        analytics.track_event("plain");
        let mut properties = EventProperties::new();
        properties.insert("level".into(), "3".into());
        analytics.track_event_with_properties("scored", &properties);

        let events = bridge.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "plain");
        assert!(events[0].properties.is_empty());
        assert_eq!(events[1].properties["level"], "3");
        assert!(events.iter().all(|event| event.target.is_none()));
    }

    #[tokio::test]
    async fn disabling_stops_tracking() {
        let (bridge, analytics) = started();
        analytics.set_enabled(false).await.unwrap().unwrap();
        assert_eq!(analytics.is_enabled().await.unwrap(), Ok(false));
        analytics.track_event("ignored");
        assert!(bridge.events().is_empty());
    }

    #[test]
    fn transmission_target_requires_started_analytics() {
        let analytics = Analytics::new(Arc::new(SimulatedBridge::new()));
        assert!(analytics.transmission_target("token").is_none());
    }
}
