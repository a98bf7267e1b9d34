//! Call layer configuration
//!
//! [`CallConfig`] collects the constants the call layer needs: the URI
//! scheme used for calling-account addresses, the component that services
//! calls, fallback labels, the identity of the incoming-call notification and
//! the list of device vendors whose security rejection is routed to a vendor
//! settings screen.
//!
//! # Usage Examples
//!
//! ```rust
//! use rcall_call_core::CallConfig;
//!
//! let config = CallConfig::new()
//!     .with_uri_scheme("tinode")
//!     .with_default_account_label("Me")
//!     .with_vendor_settings_fallback(vec!["xiaomi".to_string()]);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.address_for("usr42"), "tinode:usr42");
//! assert!(config.is_vendor_fallback("Xiaomi"));
//! ```
//!
//! Configuration can also be loaded from JSON; missing fields take their defaults:
//!
//! ```rust
//! use rcall_call_core::CallConfig;
//!
//! let config = CallConfig::from_json(r#"{"uri_scheme":"chat"}"#).unwrap();
//! assert_eq!(config.uri_scheme, "chat");
//! assert_eq!(config.incoming_call_notification_tag, "incoming_call");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CallError, CallResult};
use crate::events::LocalBroadcast;

/// Configuration of the call layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// URI scheme of calling-account and caller addresses
    pub uri_scheme: String,

    /// Component that services calls for the registered account
    pub connection_component: String,

    /// Account label used when the local user has no display name
    pub default_account_label: String,

    /// Caller name used when the calling topic has no display name
    pub unknown_caller_label: String,

    /// Tag of the incoming-call notification
    pub incoming_call_notification_tag: String,

    /// Id of the incoming-call notification
    pub incoming_call_notification_id: i32,

    /// Manufacturers (case-insensitive) whose security rejection of incoming
    /// calls is sent to the vendor's own settings screen
    pub vendor_settings_fallback: Vec<String>,

    /// Capacity of the in-process call intent bus
    pub intent_bus_capacity: usize,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            uri_scheme: "tinode".to_string(),
            connection_component: "CallConnectionService".to_string(),
            default_account_label: "Current user".to_string(),
            unknown_caller_label: "Unknown".to_string(),
            incoming_call_notification_tag: "incoming_call".to_string(),
            incoming_call_notification_id: 0,
            vendor_settings_fallback: vec!["xiaomi".to_string()],
            intent_bus_capacity: 16,
        }
    }
}

impl CallConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from JSON
    pub fn from_json(input: &str) -> CallResult<Self> {
        let config: Self = serde_json::from_str(input).map_err(|e| CallError::InvalidConfiguration {
            field: "json".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_uri_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.uri_scheme = scheme.into();
        self
    }

    pub fn with_connection_component(mut self, component: impl Into<String>) -> Self {
        self.connection_component = component.into();
        self
    }

    pub fn with_default_account_label(mut self, label: impl Into<String>) -> Self {
        self.default_account_label = label.into();
        self
    }

    pub fn with_unknown_caller_label(mut self, label: impl Into<String>) -> Self {
        self.unknown_caller_label = label.into();
        self
    }

    pub fn with_incoming_call_notification(mut self, tag: impl Into<String>, id: i32) -> Self {
        self.incoming_call_notification_tag = tag.into();
        self.incoming_call_notification_id = id;
        self
    }

    pub fn with_vendor_settings_fallback(mut self, vendors: Vec<String>) -> Self {
        self.vendor_settings_fallback = vendors;
        self
    }

    pub fn with_intent_bus_capacity(mut self, capacity: usize) -> Self {
        self.intent_bus_capacity = capacity;
        self
    }

    /// Call intent bus sized from this configuration
    pub fn intent_bus(&self) -> LocalBroadcast {
        LocalBroadcast::new(self.intent_bus_capacity)
    }

    /// `<scheme>:<id>` address
    pub fn address_for(&self, id: &str) -> String {
        format!("{}:{}", self.uri_scheme, id)
    }

    /// Whether `manufacturer` gets the vendor settings screen on security rejection
    pub fn is_vendor_fallback(&self, manufacturer: &str) -> bool {
        self.vendor_settings_fallback
            .iter()
            .any(|vendor| vendor.eq_ignore_ascii_case(manufacturer.trim()))
    }

    /// Check the configuration for values the call layer cannot work with
    pub fn validate(&self) -> CallResult<()> {
        let scheme_ok = !self.uri_scheme.is_empty()
            && self.uri_scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !scheme_ok {
            return Err(CallError::InvalidConfiguration {
                field: "uri_scheme".to_string(),
                reason: format!("'{}' is not a valid URI scheme", self.uri_scheme),
            });
        }
        if self.connection_component.is_empty() {
            return Err(CallError::MissingConfiguration {
                field: "connection_component".to_string(),
            });
        }
        if self.incoming_call_notification_tag.is_empty() {
            return Err(CallError::MissingConfiguration {
                field: "incoming_call_notification_tag".to_string(),
            });
        }
        if self.intent_bus_capacity == 0 {
            return Err(CallError::InvalidConfiguration {
                field: "intent_bus_capacity".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
