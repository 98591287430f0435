//! iOS backend: C calls into the Objective-C glue library that wraps the
//! App Center iOS SDK.
//!
//! The iOS SDK answers every query synchronously, so tasks returned from here
//! are already completed. Objects handed back by the glue (transmission targets,
//! property configurators) are autoreleased; they are retained for as long as a
//! [`NativeHandle`] refers to them.

use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr::NonNull;

use appcenter_types::{
    CustomProperties, EventProperties, LogLevel, Platform, PropertyChange, PropertyValue,
    WrapperSdk,
};

use super::{AnalyticsBridge, ConfiguratorChange, NativeBridge, NativeService, NativeTask};
use crate::error::BridgeError;
use crate::handle::NativeHandle;
use crate::task::AppCenterTask;

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFRetain(object: *const c_void) -> *const c_void;
    fn CFRelease(object: *const c_void);
}

#[link(name = "AppCenterUnity", kind = "static")]
unsafe extern "C" {
    fn appcenter_unity_get_log_level() -> c_int;
    fn appcenter_unity_set_log_level(level: c_int);
    fn appcenter_unity_set_log_url(url: *const c_char);
    fn appcenter_unity_is_configured() -> bool;
    fn appcenter_unity_configure(app_secret: *const c_char);
    fn appcenter_unity_start(
        app_secret: *const c_char,
        class_names: *const *const c_char,
        count: c_int,
    );
    fn appcenter_unity_start_services(class_names: *const *const c_char, count: c_int);
    fn appcenter_unity_set_enabled(enabled: bool);
    fn appcenter_unity_is_enabled() -> bool;
    fn appcenter_unity_get_install_id() -> *mut c_char;
    fn appcenter_unity_free_string(value: *mut c_char);
    fn appcenter_unity_set_user_id(user_id: *const c_char);
    fn appcenter_unity_set_wrapper_sdk(
        version: *const c_char,
        name: *const c_char,
        runtime_version: *const c_char,
        live_update_release_label: *const c_char,
        live_update_deployment_key: *const c_char,
        live_update_package_hash: *const c_char,
    );

    fn appcenter_unity_custom_properties_create() -> *mut c_void;
    fn appcenter_unity_custom_properties_set_string(
        properties: *mut c_void,
        key: *const c_char,
        value: *const c_char,
    );
    fn appcenter_unity_custom_properties_set_number(
        properties: *mut c_void,
        key: *const c_char,
        value: f64,
    );
    fn appcenter_unity_custom_properties_set_bool(
        properties: *mut c_void,
        key: *const c_char,
        value: bool,
    );
    fn appcenter_unity_custom_properties_set_date(
        properties: *mut c_void,
        key: *const c_char,
        seconds_since_epoch: f64,
    );
    fn appcenter_unity_custom_properties_clear(properties: *mut c_void, key: *const c_char);
    fn appcenter_unity_set_custom_properties(properties: *mut c_void);

    fn appcenter_unity_analytics_track_event(
        target: *mut c_void,
        name: *const c_char,
        keys: *const *const c_char,
        values: *const *const c_char,
        count: c_int,
    );
    fn appcenter_unity_analytics_is_enabled(target: *mut c_void) -> bool;
    fn appcenter_unity_analytics_set_enabled(target: *mut c_void, enabled: bool);
    fn appcenter_unity_analytics_get_transmission_target(
        parent: *mut c_void,
        token: *const c_char,
    ) -> *mut c_void;
    fn appcenter_unity_transmission_target_get_property_configurator(
        target: *mut c_void,
    ) -> *mut c_void;
    fn appcenter_unity_property_configurator_set_app_name(
        configurator: *mut c_void,
        value: *const c_char,
    );
    fn appcenter_unity_property_configurator_set_app_version(
        configurator: *mut c_void,
        value: *const c_char,
    );
    fn appcenter_unity_property_configurator_set_app_locale(
        configurator: *mut c_void,
        value: *const c_char,
    );
    fn appcenter_unity_property_configurator_set_event_property(
        configurator: *mut c_void,
        key: *const c_char,
        value: *const c_char,
    );
    fn appcenter_unity_property_configurator_remove_event_property(
        configurator: *mut c_void,
        key: *const c_char,
    );
}

/// Retained Objective-C object owned by the iOS SDK.
#[derive(Debug)]
pub struct ObjcObject(NonNull<c_void>);

// SAFETY: the glue only hands out thread-safe SDK objects, and the retain count
// is managed with CFRetain/CFRelease, which are thread-safe.
unsafe impl Send for ObjcObject {}
unsafe impl Sync for ObjcObject {}

impl ObjcObject {
    /// Retain an object returned by the glue, or `None` for nil.
    fn retain(raw: *mut c_void) -> Option<Self> {
        let object = NonNull::new(raw)?;
        // SAFETY: `object` is a live Objective-C object returned by the glue.
        unsafe {
            CFRetain(object.as_ptr());
        }
        Some(Self(object))
    }

    fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl Clone for ObjcObject {
    fn clone(&self) -> Self {
        // SAFETY: `self` holds a retain, so the object is alive.
        unsafe {
            CFRetain(self.0.as_ptr());
        }
        Self(self.0)
    }
}

impl Drop for ObjcObject {
    fn drop(&mut self) {
        // SAFETY: balances the retain taken when this value was created.
        unsafe { CFRelease(self.0.as_ptr()) }
    }
}

fn c_string(operation: &'static str, value: &str) -> Option<CString> {
    match CString::new(value) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(operation, error = %err, "String contains NUL, native call skipped");
            None
        }
    }
}

fn optional_c_string(operation: &'static str, value: Option<&str>) -> Option<Option<CString>> {
    match value {
        Some(value) => c_string(operation, value).map(Some),
        None => Some(None),
    }
}

fn ptr_or_null(value: Option<&CString>) -> *const c_char {
    value.map_or(std::ptr::null(), |value| value.as_ptr())
}

fn object_ptr(operation: &'static str, handle: Option<&NativeHandle>) -> Option<*mut c_void> {
    match handle {
        None => Some(std::ptr::null_mut()),
        Some(NativeHandle::Ios(object)) => Some(object.as_ptr()),
        Some(_) => {
            tracing::warn!(operation, "Handle does not belong to the iOS SDK");
            None
        }
    }
}

fn class_names(services: &[NativeService]) -> Vec<CString> {
    services
        .iter()
        .filter_map(|service| c_string("start", service.class_name))
        .collect()
}

/// Native bridge over the App Center iOS SDK.
#[derive(Debug, Default)]
pub struct IosBridge;

impl IosBridge {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl NativeBridge for IosBridge {
    fn platform(&self) -> Option<Platform> {
        Some(Platform::Ios)
    }

    fn log_level(&self) -> LogLevel {
        // SAFETY: plain getter with no arguments.
        let raw = unsafe { appcenter_unity_get_log_level() };
        LogLevel::try_from(raw).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Native SDK reported an unknown log level");
            LogLevel::default()
        })
    }

    fn set_log_level(&self, level: LogLevel) {
        // SAFETY: plain setter taking an integer.
        unsafe { appcenter_unity_set_log_level(level.as_i32()) }
    }

    fn set_log_url(&self, url: &str) {
        let Some(url) = c_string("set_log_url", url) else {
            return;
        };
        // SAFETY: `url` is a valid NUL-terminated string for the duration of the call.
        unsafe { appcenter_unity_set_log_url(url.as_ptr()) }
    }

    fn is_configured(&self) -> bool {
        // SAFETY: plain getter with no arguments.
        unsafe { appcenter_unity_is_configured() }
    }

    fn configure(&self, app_secret: &str) {
        let Some(secret) = c_string("configure", app_secret) else {
            return;
        };
        // SAFETY: `secret` outlives the call.
        unsafe { appcenter_unity_configure(secret.as_ptr()) }
    }

    fn start(&self, app_secret: &str, services: &[NativeService]) {
        let Some(secret) = c_string("start", app_secret) else {
            return;
        };
        let names = class_names(services);
        let pointers: Vec<*const c_char> = names.iter().map(|name| name.as_ptr()).collect();
        // SAFETY: `secret`, `names` and `pointers` outlive the call; `count`
        // matches the pointer array length.
        unsafe {
            appcenter_unity_start(secret.as_ptr(), pointers.as_ptr(), pointers.len() as c_int);
        }
    }

    fn start_services(&self, services: &[NativeService]) {
        let names = class_names(services);
        let pointers: Vec<*const c_char> = names.iter().map(|name| name.as_ptr()).collect();
        // SAFETY: `names` and `pointers` outlive the call.
        unsafe { appcenter_unity_start_services(pointers.as_ptr(), pointers.len() as c_int) }
    }

    fn set_enabled(&self, enabled: bool) -> NativeTask<()> {
        // SAFETY: plain setter taking a bool.
        unsafe { appcenter_unity_set_enabled(enabled) };
        AppCenterTask::completed(Ok(()))
    }

    fn is_enabled(&self) -> NativeTask<bool> {
        // SAFETY: plain getter with no arguments.
        AppCenterTask::completed(Ok(unsafe { appcenter_unity_is_enabled() }))
    }

    fn install_id(&self) -> NativeTask<Option<String>> {
        // SAFETY: the glue returns NULL or a heap string it allocated, which is
        // copied and then released through the glue's own free function.
        let install_id = unsafe {
            let raw = appcenter_unity_get_install_id();
            if raw.is_null() {
                None
            } else {
                let value = CStr::from_ptr(raw).to_string_lossy().into_owned();
                appcenter_unity_free_string(raw);
                Some(value)
            }
        };
        AppCenterTask::completed(Ok(install_id))
    }

    fn set_user_id(&self, user_id: &str) {
        let Some(user_id) = c_string("set_user_id", user_id) else {
            return;
        };
        // SAFETY: `user_id` outlives the call.
        unsafe { appcenter_unity_set_user_id(user_id.as_ptr()) }
    }

    fn set_custom_properties(&self, properties: &CustomProperties) {
        // SAFETY: the glue returns a fresh autoreleased property bag that stays
        // alive for the rest of this call; every key/value pointer outlives the
        // call that receives it.
        unsafe {
            let bag = appcenter_unity_custom_properties_create();
            if bag.is_null() {
                tracing::warn!("Native SDK could not allocate custom properties");
                return;
            }
            for (key, change) in properties.iter() {
                let Some(key) = c_string("set_custom_properties", key) else {
                    continue;
                };
                match change {
                    PropertyChange::Set(PropertyValue::String(value)) => {
                        if let Some(value) = c_string("set_custom_properties", value) {
                            appcenter_unity_custom_properties_set_string(
                                bag,
                                key.as_ptr(),
                                value.as_ptr(),
                            );
                        }
                    }
                    PropertyChange::Set(PropertyValue::Number(value)) => {
                        appcenter_unity_custom_properties_set_number(bag, key.as_ptr(), *value);
                    }
                    PropertyChange::Set(PropertyValue::Bool(value)) => {
                        appcenter_unity_custom_properties_set_bool(bag, key.as_ptr(), *value);
                    }
                    PropertyChange::Set(PropertyValue::Date(value)) => {
                        let seconds = value.timestamp_millis() as f64 / 1000.0;
                        appcenter_unity_custom_properties_set_date(bag, key.as_ptr(), seconds);
                    }
                    PropertyChange::Clear => {
                        appcenter_unity_custom_properties_clear(bag, key.as_ptr());
                    }
                }
            }
            appcenter_unity_set_custom_properties(bag);
        }
    }

    fn set_wrapper_sdk(&self, sdk: &WrapperSdk) {
        let operation = "set_wrapper_sdk";
        let (
            Some(version),
            Some(name),
            Some(runtime),
            Some(label),
            Some(key),
            Some(hash),
        ) = (
            c_string(operation, &sdk.version),
            c_string(operation, &sdk.name),
            optional_c_string(operation, sdk.runtime_version.as_deref()),
            optional_c_string(operation, sdk.live_update_release_label.as_deref()),
            optional_c_string(operation, sdk.live_update_deployment_key.as_deref()),
            optional_c_string(operation, sdk.live_update_package_hash.as_deref()),
        )
        else {
            return;
        };
        // SAFETY: every string outlives the call; absent values are passed as NULL.
        unsafe {
            appcenter_unity_set_wrapper_sdk(
                version.as_ptr(),
                name.as_ptr(),
                ptr_or_null(runtime.as_ref()),
                ptr_or_null(label.as_ref()),
                ptr_or_null(key.as_ref()),
                ptr_or_null(hash.as_ref()),
            );
        }
    }
}

impl AnalyticsBridge for IosBridge {
    fn track_event(
        &self,
        target: Option<&NativeHandle>,
        name: &str,
        properties: Option<&EventProperties>,
    ) {
        let operation = "track_event";
        let (Some(target), Some(name)) = (object_ptr(operation, target), c_string(operation, name))
        else {
            return;
        };
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for (key, value) in properties.into_iter().flatten() {
            if let (Some(key), Some(value)) = (c_string(operation, key), c_string(operation, value))
            {
                keys.push(key);
                values.push(value);
            }
        }
        let key_ptrs: Vec<*const c_char> = keys.iter().map(|key| key.as_ptr()).collect();
        let value_ptrs: Vec<*const c_char> = values.iter().map(|value| value.as_ptr()).collect();
        // SAFETY: all strings and pointer arrays outlive the call; both arrays
        // have `count` entries. A NULL target addresses the Analytics service.
        unsafe {
            appcenter_unity_analytics_track_event(
                target,
                name.as_ptr(),
                key_ptrs.as_ptr(),
                value_ptrs.as_ptr(),
                key_ptrs.len() as c_int,
            );
        }
    }

    fn is_target_enabled(&self, target: Option<&NativeHandle>) -> NativeTask<bool> {
        let Some(target) = object_ptr("is_target_enabled", target) else {
            return AppCenterTask::completed(Err(BridgeError::native(
                "is_target_enabled",
                "foreign handle",
            )));
        };
        // SAFETY: `target` is NULL or a retained SDK object.
        AppCenterTask::completed(Ok(unsafe { appcenter_unity_analytics_is_enabled(target) }))
    }

    fn set_target_enabled(&self, target: Option<&NativeHandle>, enabled: bool) -> NativeTask<()> {
        let Some(target) = object_ptr("set_target_enabled", target) else {
            return AppCenterTask::completed(Err(BridgeError::native(
                "set_target_enabled",
                "foreign handle",
            )));
        };
        // SAFETY: `target` is NULL or a retained SDK object.
        unsafe { appcenter_unity_analytics_set_enabled(target, enabled) };
        AppCenterTask::completed(Ok(()))
    }

    fn transmission_target(
        &self,
        parent: Option<&NativeHandle>,
        token: &str,
    ) -> Option<NativeHandle> {
        let parent = object_ptr("transmission_target", parent)?;
        let token = c_string("transmission_target", token)?;
        // SAFETY: `parent` is NULL or a retained SDK object; `token` outlives the call.
        let raw = unsafe { appcenter_unity_analytics_get_transmission_target(parent, token.as_ptr()) };
        ObjcObject::retain(raw).map(NativeHandle::Ios)
    }

    fn property_configurator(&self, target: &NativeHandle) -> Option<NativeHandle> {
        let target = object_ptr("property_configurator", Some(target))?;
        // SAFETY: `target` is a retained transmission target.
        let raw = unsafe { appcenter_unity_transmission_target_get_property_configurator(target) };
        ObjcObject::retain(raw).map(NativeHandle::Ios)
    }

    fn configure_property(&self, configurator: &NativeHandle, change: &ConfiguratorChange) {
        let operation = "configure_property";
        let Some(configurator) = object_ptr(operation, Some(configurator)) else {
            return;
        };
        // SAFETY: `configurator` is a retained SDK object and every string
        // outlives the call that receives it.
        unsafe {
            match change {
                ConfiguratorChange::AppName(value) => {
                    if let Some(value) = c_string(operation, value) {
                        appcenter_unity_property_configurator_set_app_name(configurator, value.as_ptr());
                    }
                }
                ConfiguratorChange::AppVersion(value) => {
                    if let Some(value) = c_string(operation, value) {
                        appcenter_unity_property_configurator_set_app_version(
                            configurator,
                            value.as_ptr(),
                        );
                    }
                }
                ConfiguratorChange::AppLocale(value) => {
                    if let Some(value) = c_string(operation, value) {
                        appcenter_unity_property_configurator_set_app_locale(
                            configurator,
                            value.as_ptr(),
                        );
                    }
                }
                ConfiguratorChange::SetEventProperty { key, value } => {
                    if let (Some(key), Some(value)) =
                        (c_string(operation, key), c_string(operation, value))
                    {
                        appcenter_unity_property_configurator_set_event_property(
                            configurator,
                            key.as_ptr(),
                            value.as_ptr(),
                        );
                    }
                }
                ConfiguratorChange::RemoveEventProperty(key) => {
                    if let Some(key) = c_string(operation, key) {
                        appcenter_unity_property_configurator_remove_event_property(
                            configurator,
                            key.as_ptr(),
                        );
                    }
                }
            }
        }
    }
}
