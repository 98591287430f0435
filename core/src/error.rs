use appcenter_types::ServiceId;
use thiserror::Error;

/// Failure reported by, or on the way to, the native SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("native call {operation} failed: {message}")]
    NativeCall {
        operation: &'static str,
        message: String,
    },
    #[error("native call {operation} is not available on this platform")]
    Unavailable { operation: &'static str },
    #[error("install id {value:?} is not a valid UUID: {reason}")]
    MalformedInstallId { value: String, reason: String },
}

impl BridgeError {
    pub(crate) fn native(operation: &'static str, message: impl ToString) -> Self {
        Self::NativeCall {
            operation,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("service {0} has not been registered")]
    UnregisteredService(ServiceId),
    #[error("app secret is missing or empty")]
    MissingAppSecret,
}
