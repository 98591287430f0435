//! Analytics and transmission targets over the simulated SDK

use appcenter_core::SimulatedBridge;
use appcenter_types::EventProperties;

use crate::common::Session;

fn properties(pairs: &[(&str, &str)]) -> EventProperties {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect()
}

#[test]
fn events_before_start_are_dropped() {
    let session = Session::new(SimulatedBridge::new());
    session.analytics.track_event("too_early");
    assert!(session.bridge.events().is_empty());
    assert!(session.analytics.transmission_target("tenant").is_none());
}

#[test]
fn events_keep_their_properties() {
    let session = Session::started(None, "secret");
    session
        .analytics
        .track_event_with_properties("level_up", &properties(&[("level", "4"), ("class", "mage")]));

    let events = session.bridge.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "level_up");
    assert_eq!(events[0].properties, properties(&[("level", "4"), ("class", "mage")]));
}

#[tokio::test]
async fn disabling_the_sdk_disables_analytics() {
    let session = Session::started(None, "secret");
    session.app_center.set_enabled(false).await.unwrap().unwrap();
    assert_eq!(session.analytics.is_enabled().await.unwrap(), Ok(false));

    session.analytics.track_event("ignored");
    assert!(session.bridge.events().is_empty());

    session.app_center.set_enabled(true).await.unwrap().unwrap();
    session.analytics.track_event("kept");
    assert_eq!(session.bridge.events().len(), 1);
}

#[tokio::test]
async fn nested_targets_inherit_state_and_properties() {
    let session = Session::started(None, "secret");
    let parent = session.analytics.transmission_target("parent-token").unwrap();
    let child = parent.transmission_target("child-token").unwrap();

    let configurator = parent.property_configurator().unwrap();
    configurator
        .set_app_version("2.1.0")
        .set_app_locale("fr-FR")
        .set_event_property("shared", "parent");
    child
        .property_configurator()
        .unwrap()
        .set_event_property("shared", "child");

    child.track_event_with_properties("nested", &properties(&[("own", "yes")]));
    let events = session.bridge.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].target, child.handle().as_simulated());
    assert_eq!(events[0].properties, properties(&[("own", "yes"), ("shared", "child")]));

    parent.set_enabled(false).await.unwrap().unwrap();
    assert_eq!(child.is_enabled().await.unwrap(), Ok(false));
    child.track_event("dropped");
    assert_eq!(session.bridge.events().len(), 1);

    let snapshot = session
        .bridge
        .target(parent.handle().as_simulated().unwrap())
        .unwrap();
    assert_eq!(snapshot.app_version.as_deref(), Some("2.1.0"));
    assert_eq!(snapshot.app_locale.as_deref(), Some("fr-FR"));
}

#[test]
fn same_token_reuses_the_target() {
    let session = Session::started(None, "secret");
    let first = session.analytics.transmission_target("tenant").unwrap();
    let second = session.analytics.transmission_target("tenant").unwrap();
    assert_eq!(first.handle().as_simulated(), second.handle().as_simulated());

    let nested = first.transmission_target("tenant").unwrap();
    assert_ne!(nested.handle().as_simulated(), first.handle().as_simulated());
}
