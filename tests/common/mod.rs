//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use appcenter_analytics::Analytics;
use appcenter_core::{AppCenter, ServiceRegistry, SimulatedBridge};
use appcenter_types::{Platform, ServiceId};

/// A simulated SDK with both facades attached to it.
pub struct Session {
    pub bridge: Arc<SimulatedBridge>,
    pub app_center: AppCenter,
    pub analytics: Analytics,
}

impl Session {
    pub fn new(bridge: SimulatedBridge) -> Self {
        let bridge = Arc::new(bridge);
        Self {
            app_center: AppCenter::new(bridge.clone()),
            analytics: Analytics::new(bridge.clone()),
            bridge,
        }
    }

    /// Session on `platform` with Analytics started under `secrets`.
    pub fn started(platform: Option<Platform>, secrets: &str) -> Self {
        let session = Self::new(SimulatedBridge::new().with_platform(platform));
        session
            .app_center
            .start(secrets, &[ServiceId::Analytics], &analytics_registry())
            .unwrap();
        session
    }
}

pub fn analytics_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    appcenter_analytics::register(&mut registry);
    registry
}

/// Write `content` as `config.toml` inside `dir`.
pub fn write_settings(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}
