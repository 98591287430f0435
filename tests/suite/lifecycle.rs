//! Starting the SDK from settings and driving it through the core facade

use appcenter_config::{ConfigError, Settings};
use appcenter_core::{BridgeError, SimulatedBridge, StartError};
use appcenter_types::{CustomProperties, LogLevel, Platform, ServiceId};

use crate::common::{Session, analytics_registry, write_settings};

#[test]
fn settings_file_starts_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_settings(
        dir.path(),
        r#"
app_secret = "ios=IOS-SECRET;android=ANDROID-SECRET"
log_level = "debug"
user_id = "tester"
"#,
    );

    let options = Settings::load_from(&path).unwrap().resolve().unwrap();
    let session = Session::new(SimulatedBridge::new().with_platform(Some(Platform::Android)));
    session
        .app_center
        .start_with_settings(&options, &analytics_registry())
        .unwrap();

    assert_eq!(session.bridge.app_secret().as_deref(), Some("ANDROID-SECRET"));
    assert_eq!(session.bridge.started_services(), vec![ServiceId::Analytics]);
    assert_eq!(session.bridge.user_id().as_deref(), Some("tester"));
    assert_eq!(session.app_center.log_level(), LogLevel::Debug);
}

#[test]
fn settings_requesting_unregistered_service_fail_to_start() {
    let settings = Settings::from_toml_str(
        r#"
app_secret = "secret"
log_level = "verbose"
log_url = "https://logs.example.com"

[services]
crashes = true
"#,
    )
    .unwrap();
    let options = settings.resolve().unwrap();
    let session = Session::new(SimulatedBridge::new());
    let err = session
        .app_center
        .start_with_settings(&options, &analytics_registry())
        .unwrap_err();
    assert_eq!(err, StartError::UnregisteredService(ServiceId::Crashes));
    assert!(!session.app_center.is_configured());
    assert_eq!(session.app_center.log_level(), LogLevel::Warn);
    assert_eq!(session.bridge.log_url(), None);
}

#[test]
fn settings_without_secret_are_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_settings(dir.path(), "log_level = \"info\"\n");
    let err = Settings::load_from(&path).unwrap().resolve().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[tokio::test]
async fn install_id_is_a_uuid() {
    let session = Session::started(None, "secret");
    let id = session.app_center.install_id().await.unwrap().unwrap();
    assert!(id.is_some());
}

#[tokio::test]
async fn malformed_install_id_surfaces_as_error() {
    let session = Session::started(None, "secret");
    session.bridge.set_install_id(Some("{garbage}".to_string()));
    let result = session.app_center.install_id().await.unwrap();
    assert!(matches!(result, Err(BridgeError::MalformedInstallId { .. })));
}

#[tokio::test]
async fn native_failure_surfaces_as_error() {
    let session = Session::started(None, "secret");
    session.bridge.fail_calls(Some("sdk unavailable".to_string()));
    let result = session.app_center.set_enabled(false).await.unwrap();
    assert!(matches!(result, Err(BridgeError::NativeCall { operation: "set_enabled", .. })));

    session.bridge.fail_calls(None);
    assert_eq!(session.app_center.is_enabled().await.unwrap(), Ok(true));
}

#[test]
fn deferred_results_complete_from_another_thread() {
    let session = Session::new(SimulatedBridge::new().deferred());
    let enabled = session.app_center.is_enabled();
    let install_id = session.app_center.install_id();

    let bridge = session.bridge.clone();
    let completer = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(20));
        bridge.complete_pending()
    });

    assert_eq!(enabled.wait().unwrap(), Ok(true));
    assert!(install_id.wait().unwrap().unwrap().is_some());
    assert_eq!(completer.join().unwrap(), 2);
}

#[test]
fn custom_properties_reach_the_sdk() {
    let session = Session::started(None, "secret");
    let mut properties = CustomProperties::new();
    properties
        .set("tier", "gold")
        .set("score", 42_i64)
        .set("beta", true)
        .clear("legacy");
    session.app_center.set_custom_properties(&properties);

    let stored = session.bridge.custom_properties();
    assert_eq!(stored.len(), 3);
    assert!(stored.contains_key("tier"));
    assert!(!stored.contains_key("legacy"));
}

#[test]
fn log_url_is_forwarded() {
    let session = Session::new(SimulatedBridge::new());
    session.app_center.set_log_url("https://in.example.com");
    assert_eq!(session.bridge.log_url().as_deref(), Some("https://in.example.com"));
}
