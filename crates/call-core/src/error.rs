//! Error types for call-core
//!
//! Only one error is meant to reach application code: reusing a call session
//! for a different call ([`CallError::InvalidSessionState`]). That is a
//! programming error and is returned to the caller immediately. Platform
//! rejections, missing permissions and missing APIs are caught by the
//! [`CallManager`](crate::CallManager) and the
//! [`HangUpReceiver`](crate::HangUpReceiver), logged, and turned into a fallback.
//!
//! # Error Categories
//!
//! - **Session** - invalid sequence ids, session reuse, no call in progress
//! - **Permission** - a platform permission is not granted
//! - **Platform** - the telephony framework rejected the request
//! - **Configuration** - required identity or settings are missing
//!
//! ```rust
//! use rcall_call_core::CallError;
//!
//! let err = CallError::invalid_session_state("grp1", "grp2", 42);
//! assert!(err.is_usage_error());
//! assert_eq!(err.category(), "session");
//! ```

use thiserror::Error;

/// Result type alias for call-core operations
pub type CallResult<T> = Result<T, CallError>;

/// Errors produced by call-session management and platform collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Session related errors
    #[error("Call session for '{session_topic}' already holds seq {seq}; cannot bind it to '{requested_topic}'")]
    InvalidSessionState {
        session_topic: String,
        requested_topic: String,
        seq: u32,
    },

    #[error("Invalid call sequence id: {seq}")]
    InvalidSequence { seq: i64 },

    #[error("No call in progress")]
    NoCallInProgress,

    #[error("Another call is already in progress: {topic}")]
    CallAlreadyInProgress { topic: String },

    /// Permission and platform errors
    #[error("Permission denied: {permission}")]
    PermissionDenied { permission: String },

    #[error("Rejected by platform security policy: {reason}")]
    SecurityRejected { reason: String },

    #[error("Not supported on this platform: {operation}")]
    Unsupported { operation: String },

    #[error("Platform error: {reason}")]
    PlatformError { reason: String },

    /// Protocol errors
    #[error("Failed to send call signal: {reason}")]
    SignalFailed { reason: String },

    /// Configuration errors
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Missing required configuration: {field}")]
    MissingConfiguration { field: String },
}

impl CallError {
    /// Create a session-reuse error
    pub fn invalid_session_state(
        session_topic: impl Into<String>,
        requested_topic: impl Into<String>,
        seq: u32,
    ) -> Self {
        Self::InvalidSessionState {
            session_topic: session_topic.into(),
            requested_topic: requested_topic.into(),
            seq,
        }
    }

    /// Create a security rejection error
    pub fn security_rejected(reason: impl Into<String>) -> Self {
        Self::SecurityRejected { reason: reason.into() }
    }

    /// Create a platform error
    pub fn platform(reason: impl Into<String>) -> Self {
        Self::PlatformError { reason: reason.into() }
    }

    /// Create a permission denied error
    pub fn permission_denied(permission: impl Into<String>) -> Self {
        Self::PermissionDenied { permission: permission.into() }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported { operation: operation.into() }
    }

    /// Create a signalling error
    pub fn signal_failed(reason: impl Into<String>) -> Self {
        Self::SignalFailed { reason: reason.into() }
    }

    /// Errors that indicate a bug in the caller rather than a runtime condition
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            CallError::InvalidSessionState { .. } | CallError::InvalidSequence { .. }
        )
    }

    /// Check if this error is recoverable by retrying later
    pub fn is_recoverable(&self) -> bool {
        match self {
            CallError::PlatformError { .. } |
            CallError::SignalFailed { .. } |
            CallError::CallAlreadyInProgress { .. } => true,

            CallError::InvalidSessionState { .. } |
            CallError::InvalidSequence { .. } |
            CallError::NoCallInProgress |
            CallError::PermissionDenied { .. } |
            CallError::SecurityRejected { .. } |
            CallError::Unsupported { .. } |
            CallError::InvalidConfiguration { .. } |
            CallError::MissingConfiguration { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CallError::InvalidSessionState { .. } |
            CallError::InvalidSequence { .. } |
            CallError::NoCallInProgress |
            CallError::CallAlreadyInProgress { .. } => "session",

            CallError::PermissionDenied { .. } => "permission",

            CallError::SecurityRejected { .. } |
            CallError::Unsupported { .. } |
            CallError::PlatformError { .. } => "platform",

            CallError::SignalFailed { .. } => "protocol",

            CallError::InvalidConfiguration { .. } |
            CallError::MissingConfiguration { .. } => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(CallError::NoCallInProgress.category(), "session");
        assert_eq!(CallError::security_rejected("vendor").category(), "platform");
        assert_eq!(CallError::permission_denied("MANAGE_OWN_CALLS").category(), "permission");
        assert_eq!(
            CallError::MissingConfiguration { field: "my_id".into() }.category(),
            "configuration"
        );
    }

    #[test]
    fn test_usage_errors_are_not_recoverable() {
        let err = CallError::invalid_session_state("grp1", "grp2", 42);
        assert!(err.is_usage_error());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("grp2"));
        assert!(CallError::platform("binder died").is_recoverable());
        assert!(CallError::signal_failed("not attached").is_recoverable());
        assert!(!CallError::NoCallInProgress.is_recoverable());
    }
}
