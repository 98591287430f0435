//! Core of the App Center bindings.
//!
//! Bridges the native SDK's asynchronous results into [`AppCenterTask`]s,
//! resolves per-platform app secrets, and exposes the [`AppCenter`] facade over
//! a [`NativeBridge`] backend selected for the build target.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod app_center;
pub mod bridge;
mod error;
mod handle;
mod registry;
pub mod secret;
mod task;

pub use app_center::AppCenter;
pub use bridge::{
    AnalyticsBridge, ConfiguratorChange, NativeBridge, NativeService, NativeTask,
    SimulatedBridge, platform_bridge,
};
pub use error::{BridgeError, StartError};
pub use handle::{NativeHandle, SimulatedId};
pub use registry::{PrepareFn, ServiceDescriptor, ServiceRegistry};
pub use secret::{
    Fallback, SecretResolution, get_secret_for_platform, resolve_secret, secret_for_platform,
};
pub use task::{AppCenterTask, TaskAwaiter, TaskCompleter, TaskError};
