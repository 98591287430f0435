use serde::{Deserialize, Serialize};

/// Identifies this binding layer to the native SDK so its logs are attributed
/// to the wrapper rather than to a direct native integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperSdk {
    pub name: String,
    pub version: String,
    pub runtime_version: Option<String>,
    pub live_update_release_label: Option<String>,
    pub live_update_deployment_key: Option<String>,
    pub live_update_package_hash: Option<String>,
}

impl WrapperSdk {
    pub const NAME: &'static str = "appcenter.rust";

    /// Wrapper description for this build.
    #[must_use]
    pub fn current() -> Self {
        Self {
            name: Self::NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            runtime_version: option_env!("CARGO_PKG_RUST_VERSION")
                .filter(|v| !v.is_empty())
                .map(ToString::to_string),
            live_update_release_label: None,
            live_update_deployment_key: None,
            live_update_package_hash: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WrapperSdk;

    #[test]
    fn current_wrapper_has_no_live_update_fields() {
        let sdk = WrapperSdk::current();
        assert_eq!(sdk.name, "appcenter.rust");
        assert!(!sdk.version.is_empty());
        assert!(sdk.live_update_release_label.is_none());
        assert!(sdk.live_update_deployment_key.is_none());
        assert!(sdk.live_update_package_hash.is_none());
    }
}
