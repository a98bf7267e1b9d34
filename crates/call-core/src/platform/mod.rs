//! Platform collaborators consumed by call-core
//!
//! Each trait is a seam to something outside this crate: the telephony
//! framework, the connection objects it hands out, notifications, permission
//! state, the messaging SDK's topics and the UI layer. [`mock`] implements all
//! of them in memory; [`in_app`] provides the connection used when the
//! telephony framework is bypassed.

use std::fmt::Debug;
use std::sync::Arc;
use async_trait::async_trait;

use rcall_audio_core::CallAudioRoute;

use crate::error::CallResult;
use crate::types::{
    ConnectionState, DisconnectCause, IncomingCallNotification, IncomingCallRequest,
    OutgoingCallRequest, Permission, PhoneAccount, PhoneAccountHandle, SettingsScreen,
    TelecomCapabilities, UserNotice,
};

pub mod in_app;
pub mod mock;

pub use in_app::InAppConnection;

/// A platform call connection
#[async_trait]
pub trait CallConnection: Send + Sync + Debug {
    async fn state(&self) -> ConnectionState;

    async fn set_active(&self);

    async fn set_disconnected(&self, cause: DisconnectCause);

    /// Release the connection. No further calls are expected afterwards.
    async fn destroy(&self);

    /// Whether the audio route of this connection is controlled by the telephony framework
    fn supports_audio_routing(&self) -> bool;

    async fn audio_route(&self) -> Option<CallAudioRoute>;

    /// Request a route change. Returns whether the request was accepted.
    async fn set_audio_route(&self, route: CallAudioRoute) -> bool;
}

/// Platform telephony framework
#[async_trait]
pub trait TelecomService: Send + Sync {
    fn capabilities(&self) -> TelecomCapabilities;

    async fn register_phone_account(&self, account: &PhoneAccount) -> CallResult<()>;

    async fn unregister_phone_account(&self, handle: &PhoneAccountHandle) -> CallResult<()>;

    /// Place an outgoing call to `address` (`<scheme>:<callee>`)
    async fn place_call(&self, address: &str, request: &OutgoingCallRequest) -> CallResult<()>;

    async fn add_new_incoming_call(&self, request: &IncomingCallRequest) -> CallResult<()>;

    async fn is_outgoing_call_permitted(&self, handle: &PhoneAccountHandle) -> CallResult<bool>;

    async fn is_incoming_call_permitted(&self, handle: &PhoneAccountHandle) -> CallResult<bool>;
}

/// Platform notification service
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn notify_incoming_call(&self, notification: IncomingCallNotification) -> CallResult<()>;

    /// Cancel the notification identified by `(tag, id)`. Unknown pairs are ignored.
    async fn cancel(&self, tag: &str, id: i32);
}

/// Runtime permission state
pub trait PermissionChecker: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
}

/// The messaging SDK session: local identity and topic lookup
#[async_trait]
pub trait MessagingSession: Send + Sync {
    /// Local user id, `None` before login
    fn my_id(&self) -> Option<String>;

    /// Local user's display name, if set
    fn my_display_name(&self) -> Option<String>;

    /// Resolve a live topic by name
    async fn topic(&self, name: &str) -> Option<Arc<dyn CallTopic>>;
}

/// A conversation topic able to carry call signals
#[async_trait]
pub trait CallTopic: Send + Sync {
    fn name(&self) -> &str;

    /// Display name of the topic (the peer for one-to-one topics)
    fn display_name(&self) -> Option<String>;

    /// Tell the peer the call with invite `seq` is hung up or declined
    async fn video_call_hang_up(&self, seq: u32) -> CallResult<()>;

    /// Tell the peer the call with invite `seq` is ringing here
    async fn video_call_ringing(&self, seq: u32) -> CallResult<()>;
}

/// UI surfaces the call layer can ask for
#[async_trait]
pub trait CallUi: Send + Sync {
    /// Open the in-app outgoing call screen
    async fn show_outgoing_call(&self, topic: &str, audio_only: bool);

    async fn open_settings(&self, screen: SettingsScreen);

    async fn notify_user(&self, notice: UserNotice);
}
