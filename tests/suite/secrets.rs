//! App secret resolution through the public API

use appcenter_core::{Fallback, SecretResolution, resolve_secret, secret_for_platform};
use appcenter_types::Platform;

use crate::common::Session;

#[test]
fn each_platform_gets_its_own_secret() {
    let secrets = "ios=AAA;android=BBB;uwp=CCC";
    assert_eq!(secret_for_platform(Some(Platform::Ios), Some(secrets)).as_deref(), Some("AAA"));
    assert_eq!(
        secret_for_platform(Some(Platform::Android), Some(secrets)).as_deref(),
        Some("BBB")
    );
    assert_eq!(secret_for_platform(Some(Platform::Uwp), Some(secrets)).as_deref(), Some("CCC"));
}

#[test]
fn absent_input_stays_absent() {
    assert_eq!(secret_for_platform(Some(Platform::Ios), None), None);
    assert_eq!(secret_for_platform(None, None), None);
}

#[test]
fn bare_secret_passes_through() {
    assert_eq!(
        resolve_secret(Some(Platform::Android), "0d5c6d4a-bare"),
        SecretResolution::Unchanged {
            secrets: "0d5c6d4a-bare",
            reason: Fallback::BareSecret,
        }
    );
}

#[test]
fn unlisted_platform_passes_through() {
    let resolution = resolve_secret(Some(Platform::Uwp), "ios=AAA;android=BBB");
    assert_eq!(resolution.fallback(), Some(Fallback::PlatformNotListed));
    assert_eq!(resolution.secret(), "ios=AAA;android=BBB");
}

#[test]
fn no_platform_passes_through() {
    let resolution = resolve_secret(None, "ios=AAA");
    assert_eq!(resolution.fallback(), Some(Fallback::UnsupportedPlatform));
    assert_eq!(resolution.into_secret(), "ios=AAA");
}

#[test]
fn last_entry_without_terminator() {
    assert_eq!(
        resolve_secret(Some(Platform::Android), "ios=AAA;android=BBB"),
        SecretResolution::Resolved("BBB".to_string())
    );
}

#[test]
fn empty_assignment_resolves_to_empty() {
    assert_eq!(
        resolve_secret(Some(Platform::Ios), "ios=;android=BBB"),
        SecretResolution::Resolved(String::new())
    );
}

#[test]
fn substring_match_takes_first_occurrence() {
    assert_eq!(
        resolve_secret(Some(Platform::Ios), "xios=A;ios=B").secret(),
        "A"
    );
}

#[test]
fn facade_uses_bridge_platform() {
    let session = Session::new(
        appcenter_core::SimulatedBridge::new().with_platform(Some(Platform::Ios)),
    );
    assert_eq!(
        session
            .app_center
            .get_secret_for_platform(Some("android=BBB;ios=AAA"))
            .as_deref(),
        Some("AAA")
    );
}
