//! Type definitions for the call-core library
//!
//! Plain data exchanged with the platform telephony framework, the
//! notification service and the UI layer.
//!
//! # Type Categories
//!
//! - **Connection Types** - state and disconnect cause of a platform call connection
//! - **Account Types** - self-managed calling account registration
//! - **Request Types** - outgoing and incoming call requests
//! - **Surface Types** - notifications, settings screens and user notices

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::CallIntent;

// ===== CONNECTION TYPES =====

/// State of a platform call connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Initializing,
    New,
    Ringing,
    Dialing,
    Active,
    Holding,
    Disconnected,
}

impl ConnectionState {
    pub fn is_disconnected(&self) -> bool {
        matches!(self, ConnectionState::Disconnected)
    }
}

/// Why a connection was disconnected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisconnectCause {
    /// Ended on this device
    Local,
    /// Ended by the other party
    Remote,
    Rejected,
    Busy,
    Missed,
    Error,
}

// ===== ACCOUNT TYPES =====

/// Handle identifying a registered calling account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneAccountHandle {
    /// Component that services calls for this account
    pub component: String,
    /// Account id, the local user id
    pub id: String,
}

impl fmt::Display for PhoneAccountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.id)
    }
}

/// Capabilities declared for a calling account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCapabilities {
    pub video_calling: bool,
    pub supports_video_calling: bool,
    /// The app manages its own call UI and audio
    pub self_managed: bool,
}

/// A calling account as registered with the telephony framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneAccount {
    pub handle: PhoneAccountHandle,
    pub label: String,
    pub short_description: String,
    /// Address of the account, `<scheme>:<user id>`
    pub address: String,
    pub subscription_address: String,
    pub supported_uri_schemes: Vec<String>,
    pub capabilities: AccountCapabilities,
}

/// What the platform telephony framework supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelecomCapabilities {
    /// Accounts must declare themselves self-managed explicitly
    pub requires_self_managed_declaration: bool,
    /// Whether "may this account place an outgoing call now" can be queried
    pub outgoing_permission_query: bool,
    /// Whether "may this account receive an incoming call now" can be queried
    pub incoming_permission_query: bool,
}

impl TelecomCapabilities {
    /// Current platform generation: every query available
    pub fn modern() -> Self {
        Self {
            requires_self_managed_declaration: true,
            outgoing_permission_query: true,
            incoming_permission_query: true,
        }
    }

    /// Self-managed accounts exist but outgoing calls cannot be checked
    pub fn without_outgoing_query() -> Self {
        Self {
            outgoing_permission_query: false,
            ..Self::modern()
        }
    }
}

impl Default for TelecomCapabilities {
    fn default() -> Self {
        Self::modern()
    }
}

/// Platform permissions consulted before involving the telephony framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    ManageOwnCalls,
    RecordAudio,
    Camera,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::ManageOwnCalls => "MANAGE_OWN_CALLS",
            Permission::RecordAudio => "RECORD_AUDIO",
            Permission::Camera => "CAMERA",
        };
        f.write_str(name)
    }
}

// ===== REQUEST TYPES =====

/// Video state requested for a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoState {
    AudioOnly,
    Bidirectional,
}

impl VideoState {
    pub fn for_call(audio_only: bool) -> Self {
        if audio_only {
            VideoState::AudioOnly
        } else {
            VideoState::Bidirectional
        }
    }
}

/// App-level data attached to a call request and handed back to the app
/// when the framework creates the connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallExtras {
    pub topic: String,
    pub seq: Option<u32>,
    pub audio_only: bool,
}

/// Request to place an outgoing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingCallRequest {
    pub account: PhoneAccountHandle,
    /// Video state to start with; `None` for the framework default
    pub video_state: Option<VideoState>,
    pub start_with_speakerphone: bool,
    pub extras: CallExtras,
}

/// Request to announce an incoming call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingCallRequest {
    /// Caller address, `<scheme>:<topic>`
    pub address: String,
    pub account: PhoneAccountHandle,
    pub video_state: VideoState,
    pub start_with_speakerphone: bool,
    pub extras: CallExtras,
}

// ===== SURFACE TYPES =====

/// Incoming-call notification posted while the call rings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCallNotification {
    pub tag: String,
    pub id: i32,
    pub topic: String,
    pub seq: u32,
    pub caller_name: String,
    pub audio_only: bool,
    /// Opens the full-screen call UI when the body is tapped
    pub ask_user: CallIntent,
    pub answer: CallIntent,
    pub decline: CallIntent,
}

/// Settings screens the user can be sent to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingsScreen {
    /// Generic screen listing calling accounts
    CallingAccounts,
    /// Vendor-specific permission screen
    Vendor { manufacturer: String },
}

/// Short user-visible notices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserNotice {
    CallingNotSupported,
    UnableToPlaceCall,
}
