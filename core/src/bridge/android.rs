//! Android backend: JNI calls on the App Center Java SDK.
//!
//! SDK classes are loaded through the application's class loader, since threads
//! attached from native code only see the system loader. The Java SDK returns
//! `AppCenterFuture`s for asynchronous calls; they are resolved with `get()` on
//! the calling thread, so returned tasks are already completed.

use std::sync::OnceLock;

use jni::JavaVM;
use jni::errors::{Error as JniError, Result as JniResult};
use jni::objects::{GlobalRef, JClass, JObject, JObjectArray, JString, JValue, JValueOwned};
use jni::JNIEnv;

use appcenter_types::{
    CustomProperties, EventProperties, LogLevel, Platform, PropertyChange, PropertyValue,
    WrapperSdk,
};

use super::{AnalyticsBridge, ConfiguratorChange, NativeBridge, NativeService, NativeTask};
use crate::error::BridgeError;
use crate::handle::NativeHandle;
use crate::task::AppCenterTask;

const APP_CENTER: &str = "com.microsoft.appcenter.AppCenter";
const ANALYTICS: &str = "com.microsoft.appcenter.analytics.Analytics";
const CUSTOM_PROPERTIES: &str = "com.microsoft.appcenter.CustomProperties";
const WRAPPER_SDK: &str = "com.microsoft.appcenter.ingestion.models.WrapperSdk";

const FUTURE: &str = "Lcom/microsoft/appcenter/utils/async/AppCenterFuture;";
const TARGET: &str = "Lcom/microsoft/appcenter/analytics/AnalyticsTransmissionTarget;";
const CONFIGURATOR: &str = "Lcom/microsoft/appcenter/analytics/PropertyConfigurator;";
const STRING_SETTER: &str = "(Ljava/lang/String;)V";

/// Frame capacity for local references created during one bridge call.
const LOCAL_FRAME_CAPACITY: i32 = 32;

struct AndroidContext {
    vm: JavaVM,
    application: GlobalRef,
}

static CONTEXT: OnceLock<AndroidContext> = OnceLock::new();

/// Provide the JVM and `android.app.Application` the bridge calls into.
///
/// Returns `false` if a context was already installed.
pub fn initialize(vm: JavaVM, application: GlobalRef) -> bool {
    CONTEXT.set(AndroidContext { vm, application }).is_ok()
}

/// Native bridge over the App Center Android SDK.
pub struct AndroidBridge {
    context: &'static AndroidContext,
}

impl std::fmt::Debug for AndroidBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AndroidBridge").finish_non_exhaustive()
    }
}

impl AndroidBridge {
    pub fn new() -> Result<Self, BridgeError> {
        CONTEXT
            .get()
            .map(|context| Self { context })
            .ok_or(BridgeError::Unavailable {
                operation: "android_bridge",
            })
    }

    fn call<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut JNIEnv<'_>, &GlobalRef) -> JniResult<R>,
    ) -> Result<R, BridgeError> {
        let mut env = self
            .context
            .vm
            .attach_current_thread()
            .map_err(|err| BridgeError::native(operation, err))?;
        let application = &self.context.application;
        let result = env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| f(env, application));
        result.map_err(|err| {
            if env.exception_check().unwrap_or(false) {
                let _ = env.exception_describe();
                let _ = env.exception_clear();
            }
            BridgeError::native(operation, err)
        })
    }

    fn run(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut JNIEnv<'_>, &GlobalRef) -> JniResult<()>,
    ) {
        if let Err(err) = self.call(operation, f) {
            tracing::warn!(error = %err, "Native call failed");
        }
    }

    fn task<T: Send + 'static>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut JNIEnv<'_>, &GlobalRef) -> JniResult<T>,
    ) -> NativeTask<T> {
        AppCenterTask::completed(self.call(operation, f))
    }
}

fn load_class<'local>(
    env: &mut JNIEnv<'local>,
    application: &GlobalRef,
    name: &str,
) -> JniResult<JClass<'local>> {
    let loader = env
        .call_method(application, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])?
        .l()?;
    let name = env.new_string(name)?;
    let class = env
        .call_method(
            &loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&name)],
        )?
        .l()?;
    Ok(JClass::from(class))
}

fn call_static<'local>(
    env: &mut JNIEnv<'local>,
    application: &GlobalRef,
    class: &str,
    name: &str,
    sig: &str,
    args: &[JValue<'_, '_>],
) -> JniResult<JValueOwned<'local>> {
    let class = load_class(env, application, class)?;
    env.call_static_method(&class, name, sig, args)
}

/// Block on an `AppCenterFuture` and return its value.
fn resolve_future<'local>(env: &mut JNIEnv<'local>, future: &JObject<'_>) -> JniResult<JObject<'local>> {
    if future.is_null() {
        return Err(JniError::NullPtr("AppCenterFuture"));
    }
    env.call_method(future, "get", "()Ljava/lang/Object;", &[])?.l()
}

fn unbox_bool(env: &mut JNIEnv<'_>, value: &JObject<'_>) -> JniResult<bool> {
    if value.is_null() {
        return Err(JniError::NullPtr("Boolean result"));
    }
    env.call_method(value, "booleanValue", "()Z", &[])?.z()
}

fn service_classes<'local>(
    env: &mut JNIEnv<'local>,
    application: &GlobalRef,
    services: &[NativeService],
) -> JniResult<JObjectArray<'local>> {
    let array = env.new_object_array(services.len() as i32, "java/lang/Class", JObject::null())?;
    for (index, service) in services.iter().enumerate() {
        let class = load_class(env, application, service.class_name)?;
        env.set_object_array_element(&array, index as i32, &class)?;
    }
    Ok(array)
}

fn java_map<'local>(
    env: &mut JNIEnv<'local>,
    properties: &EventProperties,
) -> JniResult<JObject<'local>> {
    let map = env.new_object("java/util/HashMap", "()V", &[])?;
    for (key, value) in properties {
        let key = env.new_string(key)?;
        let value = env.new_string(value)?;
        env.call_method(
            &map,
            "put",
            "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
            &[JValue::Object(&key), JValue::Object(&value)],
        )?;
    }
    Ok(map)
}

fn set_optional_string(
    env: &mut JNIEnv<'_>,
    object: &JObject<'_>,
    setter: &str,
    value: Option<&str>,
) -> JniResult<()> {
    let Some(value) = value else {
        return Ok(());
    };
    let value = env.new_string(value)?;
    env.call_method(object, setter, STRING_SETTER, &[JValue::Object(&value)])?;
    Ok(())
}

fn global_handle(env: &mut JNIEnv<'_>, object: &JObject<'_>) -> JniResult<Option<NativeHandle>> {
    if object.is_null() {
        return Ok(None);
    }
    Ok(Some(NativeHandle::Android(env.new_global_ref(object)?)))
}

fn target_ref(handle: &NativeHandle) -> JniResult<&GlobalRef> {
    match handle {
        NativeHandle::Android(object) => Ok(object),
        _ => Err(JniError::NullPtr("handle does not belong to the Android SDK")),
    }
}

impl NativeBridge for AndroidBridge {
    fn platform(&self) -> Option<Platform> {
        Some(Platform::Android)
    }

    fn log_level(&self) -> LogLevel {
        let raw = self.call("log_level", |env, app| {
            call_static(env, app, APP_CENTER, "getLogLevel", "()I", &[])?.i()
        });
        match raw.map(LogLevel::try_from) {
            Ok(Ok(level)) => level,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "Native SDK reported an unknown log level");
                LogLevel::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "Native call failed");
                LogLevel::default()
            }
        }
    }

    fn set_log_level(&self, level: LogLevel) {
        self.run("set_log_level", |env, app| {
            call_static(env, app, APP_CENTER, "setLogLevel", "(I)V", &[JValue::Int(level.as_i32())])?;
            Ok(())
        });
    }

    fn set_log_url(&self, url: &str) {
        self.run("set_log_url", |env, app| {
            let url = env.new_string(url)?;
            call_static(env, app, APP_CENTER, "setLogUrl", STRING_SETTER, &[JValue::Object(&url)])?;
            Ok(())
        });
    }

    fn is_configured(&self) -> bool {
        self.call("is_configured", |env, app| {
            call_static(env, app, APP_CENTER, "isConfigured", "()Z", &[])?.z()
        })
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Native call failed");
            false
        })
    }

    fn configure(&self, app_secret: &str) {
        self.run("configure", |env, app| {
            let secret = env.new_string(app_secret)?;
            call_static(
                env,
                app,
                APP_CENTER,
                "configure",
                "(Landroid/app/Application;Ljava/lang/String;)V",
                &[JValue::Object(app.as_obj()), JValue::Object(&secret)],
            )?;
            Ok(())
        });
    }

    fn start(&self, app_secret: &str, services: &[NativeService]) {
        self.run("start", |env, app| {
            let secret = env.new_string(app_secret)?;
            let classes = service_classes(env, app, services)?;
            call_static(
                env,
                app,
                APP_CENTER,
                "start",
                "(Landroid/app/Application;Ljava/lang/String;[Ljava/lang/Class;)V",
                &[
                    JValue::Object(app.as_obj()),
                    JValue::Object(&secret),
                    JValue::Object(&classes),
                ],
            )?;
            Ok(())
        });
    }

    fn start_services(&self, services: &[NativeService]) {
        self.run("start_services", |env, app| {
            let classes = service_classes(env, app, services)?;
            call_static(
                env,
                app,
                APP_CENTER,
                "start",
                "([Ljava/lang/Class;)V",
                &[JValue::Object(&classes)],
            )?;
            Ok(())
        });
    }

    fn set_enabled(&self, enabled: bool) -> NativeTask<()> {
        self.task("set_enabled", |env, app| {
            let future = call_static(
                env,
                app,
                APP_CENTER,
                "setEnabled",
                &format!("(Z){FUTURE}"),
                &[JValue::Bool(enabled.into())],
            )?
            .l()?;
            resolve_future(env, &future)?;
            Ok(())
        })
    }

    fn is_enabled(&self) -> NativeTask<bool> {
        self.task("is_enabled", |env, app| {
            let future = call_static(env, app, APP_CENTER, "isEnabled", &format!("(){FUTURE}"), &[])?
                .l()?;
            let value = resolve_future(env, &future)?;
            unbox_bool(env, &value)
        })
    }

    fn install_id(&self) -> NativeTask<Option<String>> {
        self.task("install_id", |env, app| {
            let future =
                call_static(env, app, APP_CENTER, "getInstallId", &format!("(){FUTURE}"), &[])?
                    .l()?;
            let uuid = resolve_future(env, &future)?;
            if uuid.is_null() {
                return Ok(None);
            }
            let text = env
                .call_method(&uuid, "toString", "()Ljava/lang/String;", &[])?
                .l()?;
            let text = JString::from(text);
            let value: String = env.get_string(&text)?.into();
            Ok(Some(value))
        })
    }

    fn set_user_id(&self, user_id: &str) {
        self.run("set_user_id", |env, app| {
            let user_id = env.new_string(user_id)?;
            call_static(env, app, APP_CENTER, "setUserId", STRING_SETTER, &[JValue::Object(&user_id)])?;
            Ok(())
        });
    }

    fn set_custom_properties(&self, properties: &CustomProperties) {
        self.run("set_custom_properties", |env, app| {
            let class = load_class(env, app, CUSTOM_PROPERTIES)?;
            let bag = env.new_object(&class, "()V", &[])?;
            let returns = "Lcom/microsoft/appcenter/CustomProperties;";
            for (key, change) in properties.iter() {
                let key = env.new_string(key)?;
                match change {
                    PropertyChange::Set(PropertyValue::String(value)) => {
                        let value = env.new_string(value)?;
                        env.call_method(
                            &bag,
                            "set",
                            format!("(Ljava/lang/String;Ljava/lang/String;){returns}"),
                            &[JValue::Object(&key), JValue::Object(&value)],
                        )?;
                    }
                    PropertyChange::Set(PropertyValue::Number(value)) => {
                        let boxed = env.new_object("java/lang/Double", "(D)V", &[JValue::Double(*value)])?;
                        env.call_method(
                            &bag,
                            "set",
                            format!("(Ljava/lang/String;Ljava/lang/Number;){returns}"),
                            &[JValue::Object(&key), JValue::Object(&boxed)],
                        )?;
                    }
                    PropertyChange::Set(PropertyValue::Bool(value)) => {
                        env.call_method(
                            &bag,
                            "set",
                            format!("(Ljava/lang/String;Z){returns}"),
                            &[JValue::Object(&key), JValue::Bool((*value).into())],
                        )?;
                    }
                    PropertyChange::Set(PropertyValue::Date(value)) => {
                        let date = env.new_object(
                            "java/util/Date",
                            "(J)V",
                            &[JValue::Long(value.timestamp_millis())],
                        )?;
                        env.call_method(
                            &bag,
                            "set",
                            format!("(Ljava/lang/String;Ljava/util/Date;){returns}"),
                            &[JValue::Object(&key), JValue::Object(&date)],
                        )?;
                    }
                    PropertyChange::Clear => {
                        env.call_method(
                            &bag,
                            "clear",
                            format!("(Ljava/lang/String;){returns}"),
                            &[JValue::Object(&key)],
                        )?;
                    }
                }
            }
            call_static(
                env,
                app,
                APP_CENTER,
                "setCustomProperties",
                &format!("({returns})V"),
                &[JValue::Object(&bag)],
            )?;
            Ok(())
        });
    }

    fn set_wrapper_sdk(&self, sdk: &WrapperSdk) {
        self.run("set_wrapper_sdk", |env, app| {
            let class = load_class(env, app, WRAPPER_SDK)?;
            let wrapper = env.new_object(&class, "()V", &[])?;
            set_optional_string(env, &wrapper, "setWrapperSdkVersion", Some(&sdk.version))?;
            set_optional_string(env, &wrapper, "setWrapperSdkName", Some(&sdk.name))?;
            set_optional_string(
                env,
                &wrapper,
                "setWrapperRuntimeVersion",
                sdk.runtime_version.as_deref(),
            )?;
            set_optional_string(
                env,
                &wrapper,
                "setLiveUpdateReleaseLabel",
                sdk.live_update_release_label.as_deref(),
            )?;
            set_optional_string(
                env,
                &wrapper,
                "setLiveUpdateDeploymentKey",
                sdk.live_update_deployment_key.as_deref(),
            )?;
            set_optional_string(
                env,
                &wrapper,
                "setLiveUpdatePackageHash",
                sdk.live_update_package_hash.as_deref(),
            )?;
            call_static(
                env,
                app,
                APP_CENTER,
                "setWrapperSdk",
                "(Lcom/microsoft/appcenter/ingestion/models/WrapperSdk;)V",
                &[JValue::Object(&wrapper)],
            )?;
            Ok(())
        });
    }
}

impl AnalyticsBridge for AndroidBridge {
    fn track_event(
        &self,
        target: Option<&NativeHandle>,
        name: &str,
        properties: Option<&EventProperties>,
    ) {
        self.run("track_event", |env, app| {
            let name = env.new_string(name)?;
            let map = match properties {
                Some(properties) => Some(java_map(env, properties)?),
                None => None,
            };
            let (sig, args): (&str, Vec<JValue<'_, '_>>) = match &map {
                Some(map) => (
                    "(Ljava/lang/String;Ljava/util/Map;)V",
                    vec![JValue::Object(&name), JValue::Object(map)],
                ),
                None => (STRING_SETTER, vec![JValue::Object(&name)]),
            };
            match target {
                Some(target) => {
                    env.call_method(target_ref(target)?, "trackEvent", sig, &args)?;
                }
                None => {
                    call_static(env, app, ANALYTICS, "trackEvent", sig, &args)?;
                }
            }
            Ok(())
        });
    }

    fn is_target_enabled(&self, target: Option<&NativeHandle>) -> NativeTask<bool> {
        self.task("is_target_enabled", |env, app| {
            let sig = format!("(){FUTURE}");
            let future = match target {
                Some(target) => env.call_method(target_ref(target)?, "isEnabledAsync", &sig, &[])?,
                None => call_static(env, app, ANALYTICS, "isEnabled", &sig, &[])?,
            }
            .l()?;
            let value = resolve_future(env, &future)?;
            unbox_bool(env, &value)
        })
    }

    fn set_target_enabled(&self, target: Option<&NativeHandle>, enabled: bool) -> NativeTask<()> {
        self.task("set_target_enabled", |env, app| {
            let sig = format!("(Z){FUTURE}");
            let args = [JValue::Bool(enabled.into())];
            let future = match target {
                Some(target) => {
                    env.call_method(target_ref(target)?, "setEnabledAsync", &sig, &args)?
                }
                None => call_static(env, app, ANALYTICS, "setEnabled", &sig, &args)?,
            }
            .l()?;
            resolve_future(env, &future)?;
            Ok(())
        })
    }

    fn transmission_target(
        &self,
        parent: Option<&NativeHandle>,
        token: &str,
    ) -> Option<NativeHandle> {
        self.call("transmission_target", |env, app| {
            let token = env.new_string(token)?;
            let sig = format!("(Ljava/lang/String;){TARGET}");
            let args = [JValue::Object(&token)];
            let target = match parent {
                Some(parent) => {
                    env.call_method(target_ref(parent)?, "getTransmissionTarget", &sig, &args)?
                }
                None => call_static(env, app, ANALYTICS, "getTransmissionTarget", &sig, &args)?,
            }
            .l()?;
            global_handle(env, &target)
        })
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Native call failed");
            None
        })
    }

    fn property_configurator(&self, target: &NativeHandle) -> Option<NativeHandle> {
        self.call("property_configurator", |env, _| {
            let configurator = env
                .call_method(
                    target_ref(target)?,
                    "getPropertyConfigurator",
                    format!("(){CONFIGURATOR}"),
                    &[],
                )?
                .l()?;
            global_handle(env, &configurator)
        })
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Native call failed");
            None
        })
    }

    fn configure_property(&self, configurator: &NativeHandle, change: &ConfiguratorChange) {
        self.run("configure_property", |env, _| {
            let configurator = target_ref(configurator)?;
            match change {
                ConfiguratorChange::AppName(value) => {
                    set_optional_string(env, configurator.as_obj(), "setAppName", Some(value))
                }
                ConfiguratorChange::AppVersion(value) => {
                    set_optional_string(env, configurator.as_obj(), "setAppVersion", Some(value))
                }
                ConfiguratorChange::AppLocale(value) => {
                    set_optional_string(env, configurator.as_obj(), "setAppLocale", Some(value))
                }
                ConfiguratorChange::SetEventProperty { key, value } => {
                    let key = env.new_string(key)?;
                    let value = env.new_string(value)?;
                    env.call_method(
                        configurator,
                        "setEventProperty",
                        "(Ljava/lang/String;Ljava/lang/String;)V",
                        &[JValue::Object(&key), JValue::Object(&value)],
                    )?;
                    Ok(())
                }
                ConfiguratorChange::RemoveEventProperty(key) => {
                    set_optional_string(
                        env,
                        configurator.as_obj(),
                        "removeEventProperty",
                        Some(key),
                    )
                }
            }
        });
    }
}
