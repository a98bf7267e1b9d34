//! Error types for platform audio operations
//!
//! Platform audio calls are best-effort. These errors are produced by
//! [`AudioService`](crate::AudioService) implementations and are always
//! absorbed by [`AudioControl`](crate::AudioControl), which logs them and
//! degrades to a `false`/no-op result.

use thiserror::Error;

/// Result type alias for audio-core operations
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors reported by the platform audio service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Permission denied: {operation}")]
    PermissionDenied { operation: String },

    #[error("Audio device not found: {device}")]
    DeviceNotFound { device: String },

    #[error("Not supported on this platform: {feature}")]
    Unsupported { feature: String },

    #[error("Platform audio error: {message}")]
    PlatformError { message: String },
}

impl AudioError {
    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::PlatformError { message: message.into() }
    }

    /// Create a permission denied error
    pub fn permission_denied(operation: impl Into<String>) -> Self {
        Self::PermissionDenied { operation: operation.into() }
    }

    /// Create an unsupported-feature error
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported { feature: feature.into() }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AudioError::PermissionDenied { .. } => "permission",
            AudioError::DeviceNotFound { .. } => "device",
            AudioError::Unsupported { .. } => "capability",
            AudioError::PlatformError { .. } => "platform",
        }
    }
}
