//! Opaque references to objects owned by the native SDK.

use std::fmt;

/// Identifier of an object held by the in-process simulated SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimulatedId(u64);

impl SimulatedId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SimulatedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a native SDK object such as a transmission target.
///
/// The binding layer forwards handles but never looks inside them. Which variants
/// exist depends on the build target; "no object" is expressed as
/// `Option<NativeHandle>::None` rather than a null handle.
#[derive(Debug, Clone)]
pub enum NativeHandle {
    /// Retained Objective-C object.
    #[cfg(target_os = "ios")]
    Ios(crate::bridge::ios::ObjcObject),
    /// JNI global reference to a JVM object.
    #[cfg(target_os = "android")]
    Android(jni::objects::GlobalRef),
    /// Object owned by [`crate::bridge::SimulatedBridge`].
    Simulated(SimulatedId),
}

impl NativeHandle {
    #[must_use]
    pub fn as_simulated(&self) -> Option<SimulatedId> {
        match self {
            Self::Simulated(id) => Some(*id),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}
