//! Services known to the bindings and how to hand them to the native SDK.

use std::collections::BTreeMap;

use appcenter_types::{Platform, ServiceId};

use crate::bridge::{NativeBridge, NativeService};
use crate::error::StartError;

/// Hook run against the bridge before a service is handed to the native SDK.
pub type PrepareFn = fn(&dyn NativeBridge);

/// How one service is named on each platform.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDescriptor {
    id: ServiceId,
    ios: &'static str,
    android: &'static str,
    uwp: &'static str,
    prepare: Option<PrepareFn>,
}

impl ServiceDescriptor {
    /// Descriptor using the stock App Center SDK class names for `id`.
    #[must_use]
    pub const fn new(id: ServiceId) -> Self {
        let (ios, android, uwp) = match id {
            ServiceId::Analytics => (
                "MSACAnalytics",
                "com.microsoft.appcenter.analytics.Analytics",
                "Microsoft.AppCenter.Analytics.Analytics",
            ),
            ServiceId::Crashes => (
                "MSACCrashes",
                "com.microsoft.appcenter.crashes.Crashes",
                "Microsoft.AppCenter.Crashes.Crashes",
            ),
            ServiceId::Distribute => (
                "MSACDistribute",
                "com.microsoft.appcenter.distribute.Distribute",
                "Microsoft.AppCenter.Distribute.Distribute",
            ),
            ServiceId::Push => (
                "MSACPush",
                "com.microsoft.appcenter.push.Push",
                "Microsoft.AppCenter.Push.Push",
            ),
        };
        Self {
            id,
            ios,
            android,
            uwp,
            prepare: None,
        }
    }

    #[must_use]
    pub const fn with_prepare(mut self, prepare: PrepareFn) -> Self {
        self.prepare = Some(prepare);
        self
    }

    #[must_use]
    pub const fn id(&self) -> ServiceId {
        self.id
    }

    /// Native class name on `platform`; the service id when there is no native SDK.
    #[must_use]
    pub const fn native_class(&self, platform: Option<Platform>) -> &'static str {
        match platform {
            Some(Platform::Ios) => self.ios,
            Some(Platform::Android) => self.android,
            Some(Platform::Uwp) => self.uwp,
            None => self.id.as_str(),
        }
    }

    #[must_use]
    pub const fn prepare(&self) -> Option<PrepareFn> {
        self.prepare
    }
}

/// Explicit table of services that may be started.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<ServiceId, ServiceDescriptor>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `descriptor`, replacing any earlier entry for the same service.
    pub fn register(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        if self.services.insert(descriptor.id, descriptor).is_some() {
            tracing::debug!(service = %descriptor.id, "Replaced service registration");
        }
        self
    }

    #[must_use]
    pub fn get(&self, id: ServiceId) -> Option<&ServiceDescriptor> {
        self.services.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: ServiceId) -> bool {
        self.services.contains_key(&id)
    }

    /// Look up every requested service, failing on the first one not registered.
    ///
    /// Duplicate ids are collapsed, keeping the first occurrence.
    pub fn resolve(
        &self,
        ids: &[ServiceId],
        platform: Option<Platform>,
    ) -> Result<Vec<(NativeService, Option<PrepareFn>)>, StartError> {
        let mut resolved: Vec<(NativeService, Option<PrepareFn>)> = Vec::with_capacity(ids.len());
        for &id in ids {
            let descriptor = self.get(id).ok_or(StartError::UnregisteredService(id))?;
            if resolved.iter().any(|(service, _)| service.id == id) {
                continue;
            }
            resolved.push((
                NativeService {
                    id,
                    class_name: descriptor.native_class(platform),
                },
                descriptor.prepare(),
            ));
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::{ServiceDescriptor, ServiceRegistry};
    use crate::error::StartError;
    use appcenter_types::{Platform, ServiceId};

    #[test]
    fn native_class_per_platform() {
        let analytics = ServiceDescriptor::new(ServiceId::Analytics);
        assert_eq!(analytics.native_class(Some(Platform::Ios)), "MSACAnalytics");
        assert_eq!(
            analytics.native_class(Some(Platform::Android)),
            "com.microsoft.appcenter.analytics.Analytics"
        );
        assert_eq!(analytics.native_class(None), "analytics");
    }

    #[test]
    fn resolve_unregistered_service_fails() {
        let mut registry = ServiceRegistry::new();
        registry.register(ServiceDescriptor::new(ServiceId::Analytics));
        let err = registry
            .resolve(&[ServiceId::Analytics, ServiceId::Crashes], None)
            .unwrap_err();
        assert_eq!(err, StartError::UnregisteredService(ServiceId::Crashes));
    }

    #[test]
    fn resolve_collapses_duplicates() {
        let mut registry = ServiceRegistry::new();
        registry
            .register(ServiceDescriptor::new(ServiceId::Analytics))
            .register(ServiceDescriptor::new(ServiceId::Crashes));
        let services = registry
            .resolve(
                &[ServiceId::Crashes, ServiceId::Analytics, ServiceId::Crashes],
                Some(Platform::Ios),
            )
            .unwrap();
        let names: Vec<_> = services.iter().map(|(service, _)| service.class_name).collect();
        assert_eq!(names, vec!["MSACCrashes", "MSACAnalytics"]);
    }
}
