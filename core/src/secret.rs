//! Per-platform app secret resolution.
//!
//! App secrets may be supplied as a single bare secret or as a list of
//! `platform=secret` assignments separated by `;`, for example
//! `ios=1234;android=abcd`. Resolution never fails: every path that cannot find a
//! platform-specific secret hands back the input unchanged and lets the native
//! SDK reject it if it is unusable. [`resolve_secret`] reports which path was
//! taken so callers can surface misconfiguration themselves.

use appcenter_types::Platform;

/// Why a secret string was returned without extracting a platform entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The build target has no platform identifier.
    UnsupportedPlatform,
    /// The string contains no `=`, so it is treated as one bare secret.
    BareSecret,
    /// The string has assignments but none for this platform.
    PlatformNotListed,
}

impl Fallback {
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::UnsupportedPlatform => "platform has no secret identifier",
            Self::BareSecret => "secret has no platform assignments",
            Self::PlatformNotListed => "no assignment for this platform",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretResolution<'a> {
    /// The value assigned to the platform. May be empty.
    Resolved(String),
    /// The input, returned as-is.
    Unchanged {
        secrets: &'a str,
        reason: Fallback,
    },
}

impl SecretResolution<'_> {
    #[must_use]
    pub fn secret(&self) -> &str {
        match self {
            Self::Resolved(secret) => secret,
            Self::Unchanged { secrets, .. } => secrets,
        }
    }

    #[must_use]
    pub fn into_secret(self) -> String {
        match self {
            Self::Resolved(secret) => secret,
            Self::Unchanged { secrets, .. } => secrets.to_string(),
        }
    }

    #[must_use]
    pub fn fallback(&self) -> Option<Fallback> {
        match self {
            Self::Resolved(_) => None,
            Self::Unchanged { reason, .. } => Some(*reason),
        }
    }
}

/// Extract the secret assigned to `platform` from `secrets`.
///
/// The platform key is located with a plain substring search for
/// `"<platform>="`, so a key that ends with the platform identifier (such as
/// `xios=`) also matches when it appears first.
#[must_use]
pub fn resolve_secret(platform: Option<Platform>, secrets: &str) -> SecretResolution<'_> {
    let Some(platform) = platform else {
        return SecretResolution::Unchanged {
            secrets,
            reason: Fallback::UnsupportedPlatform,
        };
    };
    if !secrets.contains('=') {
        return SecretResolution::Unchanged {
            secrets,
            reason: Fallback::BareSecret,
        };
    }

    let indicator = format!("{}=", platform.identifier());
    let Some(index) = secrets.find(&indicator) else {
        return SecretResolution::Unchanged {
            secrets,
            reason: Fallback::PlatformNotListed,
        };
    };

    let value = &secrets[index + indicator.len()..];
    let end = value.find(';').unwrap_or(value.len());
    SecretResolution::Resolved(value[..end].to_string())
}

/// Resolve an optional secret string for `platform`, logging fallbacks.
///
/// Absent input stays absent.
#[must_use]
pub fn secret_for_platform(platform: Option<Platform>, secrets: Option<&str>) -> Option<String> {
    let secrets = secrets?;
    let resolution = resolve_secret(platform, secrets);
    match resolution.fallback() {
        Some(reason @ (Fallback::UnsupportedPlatform | Fallback::PlatformNotListed)) => {
            tracing::warn!(
                platform = platform.map_or("unknown", Platform::identifier),
                reason = reason.describe(),
                "Using app secret string as-is"
            );
        }
        Some(Fallback::BareSecret) => {
            tracing::debug!("Using bare app secret");
        }
        None => {}
    }
    Some(resolution.into_secret())
}

/// Resolve `secrets` for the platform this crate was built for.
#[must_use]
pub fn get_secret_for_platform(secrets: Option<&str>) -> Option<String> {
    secret_for_platform(Platform::current(), secrets)
}

#[cfg(test)]
mod tests {
    use super::{Fallback, SecretResolution, resolve_secret, secret_for_platform};
    use appcenter_types::Platform;

    const BOTH: &str = "ios=ABC;android=XYZ";

    #[test]
    fn resolves_first_entry() {
        assert_eq!(
            resolve_secret(Some(Platform::Ios), BOTH),
            SecretResolution::Resolved("ABC".into())
        );
    }

    #[test]
    fn resolves_last_entry_to_end_of_string() {
        assert_eq!(
            resolve_secret(Some(Platform::Android), BOTH),
            SecretResolution::Resolved("XYZ".into())
        );
    }

    #[test]
    fn bare_secret_is_unchanged() {
        let resolution = resolve_secret(Some(Platform::Ios), "plainSecret");
        assert_eq!(resolution.secret(), "plainSecret");
        assert_eq!(resolution.fallback(), Some(Fallback::BareSecret));
    }

    #[test]
    fn missing_platform_entry_is_unchanged() {
        let resolution = resolve_secret(Some(Platform::Uwp), BOTH);
        assert_eq!(resolution.secret(), BOTH);
        assert_eq!(resolution.fallback(), Some(Fallback::PlatformNotListed));
    }

    #[test]
    fn unsupported_platform_is_unchanged() {
        let resolution = resolve_secret(None, BOTH);
        assert_eq!(resolution.secret(), BOTH);
        assert_eq!(resolution.fallback(), Some(Fallback::UnsupportedPlatform));
    }

    #[test]
    fn absent_input_stays_absent() {
        assert_eq!(secret_for_platform(Some(Platform::Ios), None), None);
        assert_eq!(secret_for_platform(None, None), None);
    }

    #[test]
    fn empty_assignment_resolves_to_empty_string() {
        assert_eq!(
            secret_for_platform(Some(Platform::Ios), Some("ios=;android=XYZ")),
            Some(String::new())
        );
        assert_eq!(
            secret_for_platform(Some(Platform::Android), Some("ios=ABC;android=")),
            Some(String::new())
        );
    }

    #[test]
    fn substring_match_takes_first_occurrence() {
        assert_eq!(
            resolve_secret(Some(Platform::Ios), "xios=WRONG;ios=RIGHT").secret(),
            "WRONG"
        );
    }

    #[test]
    fn value_may_contain_equals_signs() {
        assert_eq!(
            resolve_secret(Some(Platform::Ios), "ios=a=b;android=c").secret(),
            "a=b"
        );
    }

    #[test]
    fn unicode_values_are_preserved() {
        assert_eq!(
            resolve_secret(Some(Platform::Android), "ios=1;android=ключ;uwp=2").secret(),
            "ключ"
        );
    }

    #[test]
    fn compatibility_wrapper_returns_input_on_fallback() {
        assert_eq!(
            secret_for_platform(Some(Platform::Uwp), Some(BOTH)).as_deref(),
            Some(BOTH)
        );
    }
}
