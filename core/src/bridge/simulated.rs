//! In-process stand-in for the native SDK.
//!
//! Keeps the state a real SDK would hold (enabled flags, transmission targets,
//! custom properties) and records every accepted event, applying the same
//! gating rules: nothing is tracked before Analytics starts, and a disabled
//! SDK, service or ancestor target drops events silently.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use appcenter_types::{
    CustomProperties, EventProperties, LogLevel, Platform, PropertyChange, PropertyValue,
    ServiceId, WrapperSdk,
};

use super::{AnalyticsBridge, ConfiguratorChange, NativeBridge, NativeService, NativeTask};
use crate::error::BridgeError;
use crate::handle::{NativeHandle, SimulatedId};
use crate::task::AppCenterTask;

/// An event accepted by the simulated SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEvent {
    /// Transmission target the event was sent through, `None` for Analytics.
    pub target: Option<SimulatedId>,
    pub name: String,
    /// Explicit properties merged over the target's configured event properties.
    pub properties: EventProperties,
}

/// Snapshot of a simulated transmission target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedTarget {
    pub token: String,
    pub parent: Option<SimulatedId>,
    pub enabled: bool,
    pub configurator: SimulatedId,
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub app_locale: Option<String>,
    pub event_properties: EventProperties,
}

struct SimulatedState {
    log_level: LogLevel,
    log_url: Option<String>,
    app_secret: Option<String>,
    started: Vec<ServiceId>,
    enabled: bool,
    analytics_enabled: bool,
    install_id: Option<String>,
    user_id: Option<String>,
    custom_properties: BTreeMap<String, PropertyValue>,
    custom_property_updates: usize,
    wrapper_sdk: Option<WrapperSdk>,
    targets: BTreeMap<SimulatedId, SimulatedTarget>,
    events: Vec<TrackedEvent>,
    next_id: u64,
    failure: Option<String>,
}

impl SimulatedState {
    fn allocate_id(&mut self) -> SimulatedId {
        self.next_id += 1;
        SimulatedId::new(self.next_id)
    }

    fn analytics_started(&self) -> bool {
        self.started.contains(&ServiceId::Analytics)
    }

    fn analytics_active(&self) -> bool {
        self.analytics_started() && self.enabled && self.analytics_enabled
    }

    /// Target and its ancestors, nearest first.
    fn lineage(&self, id: SimulatedId) -> Vec<&SimulatedTarget> {
        let mut chain = Vec::new();
        let mut next = Some(id);
        while let Some(current) = next {
            let Some(target) = self.targets.get(&current) else {
                break;
            };
            chain.push(target);
            next = target.parent;
        }
        chain
    }

    fn target_active(&self, id: SimulatedId) -> bool {
        self.analytics_active() && self.lineage(id).iter().all(|target| target.enabled)
    }
}

type Deferred = Box<dyn FnOnce() + Send>;

/// Native bridge backed by in-memory state.
pub struct SimulatedBridge {
    platform: Option<Platform>,
    deferred: bool,
    state: Mutex<SimulatedState>,
    queued: Mutex<Vec<Deferred>>,
}

impl Default for SimulatedBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBridge {
    /// Simulated SDK reporting the build target's platform.
    #[must_use]
    pub fn new() -> Self {
        Self {
            platform: Platform::current(),
            deferred: false,
            state: Mutex::new(SimulatedState {
                log_level: LogLevel::default(),
                log_url: None,
                app_secret: None,
                started: Vec::new(),
                enabled: true,
                analytics_enabled: true,
                install_id: Some(uuid::Uuid::new_v4().to_string()),
                user_id: None,
                custom_properties: BTreeMap::new(),
                custom_property_updates: 0,
                wrapper_sdk: None,
                targets: BTreeMap::new(),
                events: Vec::new(),
                next_id: 0,
                failure: None,
            }),
            queued: Mutex::new(Vec::new()),
        }
    }

    /// Report `platform` instead of the build target's platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Option<Platform>) -> Self {
        self.platform = platform;
        self
    }

    /// Hold asynchronous results until [`Self::complete_pending`] is called,
    /// the way a native SDK completes them later on its own threads.
    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Deliver every held asynchronous result, returning how many were delivered.
    pub fn complete_pending(&self) -> usize {
        let queued = std::mem::take(
            &mut *self
                .queued
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let count = queued.len();
        for deliver in queued {
            deliver();
        }
        count
    }

    /// Replace the raw install identifier the SDK reports.
    pub fn set_install_id(&self, install_id: Option<String>) {
        self.lock().install_id = install_id;
    }

    /// Make every subsequent asynchronous call fail with `message`, or succeed
    /// again with `None`.
    pub fn fail_calls(&self, message: Option<String>) {
        self.lock().failure = message;
    }

    #[must_use]
    pub fn events(&self) -> Vec<TrackedEvent> {
        self.lock().events.clone()
    }

    #[must_use]
    pub fn log_url(&self) -> Option<String> {
        self.lock().log_url.clone()
    }

    #[must_use]
    pub fn app_secret(&self) -> Option<String> {
        self.lock().app_secret.clone()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.lock().user_id.clone()
    }

    #[must_use]
    pub fn started_services(&self) -> Vec<ServiceId> {
        self.lock().started.clone()
    }

    #[must_use]
    pub fn custom_properties(&self) -> BTreeMap<String, PropertyValue> {
        self.lock().custom_properties.clone()
    }

    /// Number of custom property payloads received, empty ones included.
    #[must_use]
    pub fn custom_property_updates(&self) -> usize {
        self.lock().custom_property_updates
    }

    #[must_use]
    pub fn wrapper_sdk(&self) -> Option<WrapperSdk> {
        self.lock().wrapper_sdk.clone()
    }

    #[must_use]
    pub fn target(&self, id: SimulatedId) -> Option<SimulatedTarget> {
        self.lock().targets.get(&id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond<T, F>(&self, operation: &'static str, apply: F) -> NativeTask<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SimulatedState) -> Result<T, BridgeError>,
    {
        let result = {
            let mut state = self.lock();
            match &state.failure {
                Some(message) => Err(BridgeError::native(operation, message)),
                None => apply(&mut state),
            }
        };
        if !self.deferred {
            return AppCenterTask::completed(result);
        }
        let (completer, task) = AppCenterTask::pending();
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(move || completer.complete(result)));
        task
    }

    fn start_locked(state: &mut SimulatedState, services: &[NativeService]) {
        for service in services {
            if state.started.contains(&service.id) {
                tracing::warn!(service = %service.id, "Service already started");
                continue;
            }
            state.started.push(service.id);
        }
    }
}

fn simulated_id(operation: &'static str, handle: &NativeHandle) -> Result<SimulatedId, BridgeError> {
    handle
        .as_simulated()
        .ok_or_else(|| BridgeError::native(operation, "handle does not belong to the simulated SDK"))
}

impl NativeBridge for SimulatedBridge {
    fn platform(&self) -> Option<Platform> {
        self.platform
    }

    fn log_level(&self) -> LogLevel {
        self.lock().log_level
    }

    fn set_log_level(&self, level: LogLevel) {
        self.lock().log_level = level;
    }

    fn set_log_url(&self, url: &str) {
        self.lock().log_url = Some(url.to_string());
    }

    fn is_configured(&self) -> bool {
        self.lock().app_secret.is_some()
    }

    fn configure(&self, app_secret: &str) {
        let mut state = self.lock();
        if state.app_secret.is_some() {
            tracing::warn!("App Center may only be configured once");
            return;
        }
        state.app_secret = Some(app_secret.to_string());
    }

    fn start(&self, app_secret: &str, services: &[NativeService]) {
        let mut state = self.lock();
        if state.app_secret.is_some() {
            tracing::warn!("App Center may only be configured once");
        } else {
            state.app_secret = Some(app_secret.to_string());
        }
        Self::start_locked(&mut state, services);
    }

    fn start_services(&self, services: &[NativeService]) {
        let mut state = self.lock();
        if state.app_secret.is_none() {
            tracing::warn!("Cannot start services before App Center is configured");
            return;
        }
        Self::start_locked(&mut state, services);
    }

    fn set_enabled(&self, enabled: bool) -> NativeTask<()> {
        self.respond("set_enabled", |state| {
            state.enabled = enabled;
            Ok(())
        })
    }

    fn is_enabled(&self) -> NativeTask<bool> {
        self.respond("is_enabled", |state| Ok(state.enabled))
    }

    fn install_id(&self) -> NativeTask<Option<String>> {
        self.respond("install_id", |state| Ok(state.install_id.clone()))
    }

    fn set_user_id(&self, user_id: &str) {
        self.lock().user_id = Some(user_id.to_string());
    }

    fn set_custom_properties(&self, properties: &CustomProperties) {
        let mut state = self.lock();
        state.custom_property_updates += 1;
        for (key, change) in properties.iter() {
            match change {
                PropertyChange::Set(value) => {
                    state
                        .custom_properties
                        .insert(key.to_string(), value.clone());
                }
                PropertyChange::Clear => {
                    state.custom_properties.remove(key);
                }
            }
        }
    }

    fn set_wrapper_sdk(&self, sdk: &WrapperSdk) {
        self.lock().wrapper_sdk = Some(sdk.clone());
    }
}

impl AnalyticsBridge for SimulatedBridge {
    fn track_event(
        &self,
        target: Option<&NativeHandle>,
        name: &str,
        properties: Option<&EventProperties>,
    ) {
        let mut state = self.lock();
        let target = match target.map(|handle| simulated_id("track_event", handle)).transpose() {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(error = %err, "Dropping event");
                return;
            }
        };
        let active = match target {
            Some(id) => state.target_active(id),
            None => state.analytics_active(),
        };
        if !active {
            tracing::debug!(event = name, "Analytics inactive, event dropped");
            return;
        }

        let mut merged = EventProperties::new();
        if let Some(id) = target {
            for ancestor in state.lineage(id).into_iter().rev() {
                merged.extend(ancestor.event_properties.clone());
            }
        }
        if let Some(properties) = properties {
            merged.extend(properties.clone());
        }
        state.events.push(TrackedEvent {
            target,
            name: name.to_string(),
            properties: merged,
        });
    }

    fn is_target_enabled(&self, target: Option<&NativeHandle>) -> NativeTask<bool> {
        let target = target.map(|handle| simulated_id("is_target_enabled", handle)).transpose();
        self.respond("is_target_enabled", move |state| match target? {
            Some(id) if state.targets.contains_key(&id) => Ok(state.target_active(id)),
            Some(_) => Err(BridgeError::native("is_target_enabled", "unknown transmission target")),
            None => Ok(state.analytics_active()),
        })
    }

    fn set_target_enabled(&self, target: Option<&NativeHandle>, enabled: bool) -> NativeTask<()> {
        let target = target.map(|handle| simulated_id("set_target_enabled", handle)).transpose();
        self.respond("set_target_enabled", move |state| match target? {
            Some(id) => {
                let target = state.targets.get_mut(&id).ok_or_else(|| {
                    BridgeError::native("set_target_enabled", "unknown transmission target")
                })?;
                target.enabled = enabled;
                Ok(())
            }
            None => {
                state.analytics_enabled = enabled;
                Ok(())
            }
        })
    }

    fn transmission_target(
        &self,
        parent: Option<&NativeHandle>,
        token: &str,
    ) -> Option<NativeHandle> {
        let mut state = self.lock();
        if !state.analytics_started() || token.is_empty() {
            return None;
        }
        let parent = match parent.map(|handle| simulated_id("transmission_target", handle)) {
            Some(Ok(id)) if state.targets.contains_key(&id) => Some(id),
            Some(_) => return None,
            None => None,
        };
        if let Some((id, _)) = state
            .targets
            .iter()
            .find(|(_, target)| target.parent == parent && target.token == token)
        {
            return Some(NativeHandle::Simulated(*id));
        }

        let id = state.allocate_id();
        let configurator = state.allocate_id();
        state.targets.insert(
            id,
            SimulatedTarget {
                token: token.to_string(),
                parent,
                enabled: true,
                configurator,
                app_name: None,
                app_version: None,
                app_locale: None,
                event_properties: EventProperties::new(),
            },
        );
        Some(NativeHandle::Simulated(id))
    }

    fn property_configurator(&self, target: &NativeHandle) -> Option<NativeHandle> {
        let id = target.as_simulated()?;
        self.lock()
            .targets
            .get(&id)
            .map(|target| NativeHandle::Simulated(target.configurator))
    }

    fn configure_property(&self, configurator: &NativeHandle, change: &ConfiguratorChange) {
        let Some(id) = configurator.as_simulated() else {
            tracing::warn!("Property configurator handle does not belong to the simulated SDK");
            return;
        };
        let mut state = self.lock();
        let Some(target) = state
            .targets
            .values_mut()
            .find(|target| target.configurator == id)
        else {
            tracing::warn!(configurator = %id, "Unknown property configurator");
            return;
        };
        match change {
            ConfiguratorChange::AppName(name) => target.app_name = Some(name.clone()),
            ConfiguratorChange::AppVersion(version) => target.app_version = Some(version.clone()),
            ConfiguratorChange::AppLocale(locale) => target.app_locale = Some(locale.clone()),
            ConfiguratorChange::SetEventProperty { key, value } => {
                target.event_properties.insert(key.clone(), value.clone());
            }
            ConfiguratorChange::RemoveEventProperty(key) => {
                target.event_properties.remove(key);
            }
        }
    }
}
