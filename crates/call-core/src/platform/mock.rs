//! In-memory implementations of the call-core platform traits
//!
//! Used by the unit and integration tests, and handy for running the call
//! layer headless. Every mock records what it was asked to do.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use rcall_audio_core::CallAudioRoute;

use super::{CallConnection, CallTopic, CallUi, MessagingSession, NotificationService, PermissionChecker, TelecomService};
use crate::error::{CallError, CallResult};
use crate::types::{
    ConnectionState, DisconnectCause, IncomingCallNotification, IncomingCallRequest,
    OutgoingCallRequest, Permission, PhoneAccount, PhoneAccountHandle, SettingsScreen,
    TelecomCapabilities, UserNotice,
};

// ===== CONNECTION =====

#[derive(Debug)]
struct MockConnectionState {
    state: ConnectionState,
    route: CallAudioRoute,
    disconnects: Vec<DisconnectCause>,
    set_active_count: usize,
    destroy_count: usize,
}

/// Telephony-managed connection with a controllable audio route
#[derive(Debug)]
pub struct MockConnection {
    inner: Mutex<MockConnectionState>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::with_route(CallAudioRoute::Earpiece)
    }

    pub fn with_route(route: CallAudioRoute) -> Self {
        Self {
            inner: Mutex::new(MockConnectionState {
                state: ConnectionState::Initializing,
                route,
                disconnects: Vec::new(),
                set_active_count: 0,
                destroy_count: 0,
            }),
        }
    }

    pub fn disconnects(&self) -> Vec<DisconnectCause> {
        self.inner.lock().disconnects.clone()
    }

    pub fn set_active_count(&self) -> usize {
        self.inner.lock().set_active_count
    }

    pub fn destroy_count(&self) -> usize {
        self.inner.lock().destroy_count
    }

    pub fn current_route(&self) -> CallAudioRoute {
        self.inner.lock().route
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallConnection for MockConnection {
    async fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    async fn set_active(&self) {
        let mut inner = self.inner.lock();
        inner.set_active_count += 1;
        inner.state = ConnectionState::Active;
    }

    async fn set_disconnected(&self, cause: DisconnectCause) {
        let mut inner = self.inner.lock();
        inner.disconnects.push(cause);
        inner.state = ConnectionState::Disconnected;
    }

    async fn destroy(&self) {
        self.inner.lock().destroy_count += 1;
    }

    fn supports_audio_routing(&self) -> bool {
        true
    }

    async fn audio_route(&self) -> Option<CallAudioRoute> {
        Some(self.inner.lock().route)
    }

    async fn set_audio_route(&self, route: CallAudioRoute) -> bool {
        self.inner.lock().route = route;
        true
    }
}

// ===== TELECOM =====

#[derive(Debug, Default)]
struct MockTelecomState {
    registered: Vec<PhoneAccount>,
    unregistered: Vec<PhoneAccountHandle>,
    placed: Vec<(String, OutgoingCallRequest)>,
    incoming: Vec<IncomingCallRequest>,
    place_error: Option<CallError>,
    incoming_error: Option<CallError>,
    register_error: Option<CallError>,
    outgoing_permitted: bool,
    incoming_permitted: bool,
}

/// Recording telephony framework
#[derive(Debug)]
pub struct MockTelecom {
    capabilities: TelecomCapabilities,
    inner: Mutex<MockTelecomState>,
}

impl MockTelecom {
    pub fn new(capabilities: TelecomCapabilities) -> Self {
        Self {
            capabilities,
            inner: Mutex::new(MockTelecomState {
                outgoing_permitted: true,
                incoming_permitted: true,
                ..Default::default()
            }),
        }
    }

    pub fn fail_place_call(&self, error: CallError) {
        self.inner.lock().place_error = Some(error);
    }

    pub fn fail_incoming_call(&self, error: CallError) {
        self.inner.lock().incoming_error = Some(error);
    }

    pub fn fail_registration(&self, error: CallError) {
        self.inner.lock().register_error = Some(error);
    }

    pub fn permit_outgoing(&self, permitted: bool) {
        self.inner.lock().outgoing_permitted = permitted;
    }

    pub fn permit_incoming(&self, permitted: bool) {
        self.inner.lock().incoming_permitted = permitted;
    }

    pub fn registered_accounts(&self) -> Vec<PhoneAccount> {
        self.inner.lock().registered.clone()
    }

    pub fn unregistered_accounts(&self) -> Vec<PhoneAccountHandle> {
        self.inner.lock().unregistered.clone()
    }

    pub fn placed_calls(&self) -> Vec<(String, OutgoingCallRequest)> {
        self.inner.lock().placed.clone()
    }

    pub fn incoming_calls(&self) -> Vec<IncomingCallRequest> {
        self.inner.lock().incoming.clone()
    }
}

#[async_trait]
impl TelecomService for MockTelecom {
    fn capabilities(&self) -> TelecomCapabilities {
        self.capabilities
    }

    async fn register_phone_account(&self, account: &PhoneAccount) -> CallResult<()> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.register_error.clone() {
            return Err(err);
        }
        inner.registered.push(account.clone());
        Ok(())
    }

    async fn unregister_phone_account(&self, handle: &PhoneAccountHandle) -> CallResult<()> {
        self.inner.lock().unregistered.push(handle.clone());
        Ok(())
    }

    async fn place_call(&self, address: &str, request: &OutgoingCallRequest) -> CallResult<()> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.place_error.clone() {
            return Err(err);
        }
        inner.placed.push((address.to_string(), request.clone()));
        Ok(())
    }

    async fn add_new_incoming_call(&self, request: &IncomingCallRequest) -> CallResult<()> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.incoming_error.clone() {
            return Err(err);
        }
        inner.incoming.push(request.clone());
        Ok(())
    }

    async fn is_outgoing_call_permitted(&self, _handle: &PhoneAccountHandle) -> CallResult<bool> {
        if !self.capabilities.outgoing_permission_query {
            return Err(CallError::unsupported("isOutgoingCallPermitted"));
        }
        Ok(self.inner.lock().outgoing_permitted)
    }

    async fn is_incoming_call_permitted(&self, _handle: &PhoneAccountHandle) -> CallResult<bool> {
        if !self.capabilities.incoming_permission_query {
            return Err(CallError::unsupported("isIncomingCallPermitted"));
        }
        Ok(self.inner.lock().incoming_permitted)
    }
}

// ===== NOTIFICATIONS =====

/// Recording notification service
#[derive(Debug, Default)]
pub struct MockNotifications {
    posted: Mutex<Vec<IncomingCallNotification>>,
    cancelled: Mutex<Vec<(String, i32)>>,
    posting_denied: Mutex<bool>,
}

impl MockNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to post notifications, as when the user revoked the permission
    pub fn deny_posting(&self, denied: bool) {
        *self.posting_denied.lock() = denied;
    }

    pub fn posted(&self) -> Vec<IncomingCallNotification> {
        self.posted.lock().clone()
    }

    pub fn cancelled(&self) -> Vec<(String, i32)> {
        self.cancelled.lock().clone()
    }
}

#[async_trait]
impl NotificationService for MockNotifications {
    async fn notify_incoming_call(&self, notification: IncomingCallNotification) -> CallResult<()> {
        if *self.posting_denied.lock() {
            return Err(CallError::permission_denied("POST_NOTIFICATIONS"));
        }
        self.posted.lock().push(notification);
        Ok(())
    }

    async fn cancel(&self, tag: &str, id: i32) {
        self.cancelled.lock().push((tag.to_string(), id));
    }
}

// ===== PERMISSIONS =====

/// Permission state with everything granted unless revoked
#[derive(Debug, Default)]
pub struct MockPermissions {
    revoked: Mutex<HashSet<Permission>>,
}

impl MockPermissions {
    pub fn all_granted() -> Self {
        Self::default()
    }

    pub fn revoke(&self, permission: Permission) {
        self.revoked.lock().insert(permission);
    }

    pub fn grant(&self, permission: Permission) {
        self.revoked.lock().remove(&permission);
    }
}

impl PermissionChecker for MockPermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        !self.revoked.lock().contains(&permission)
    }
}

// ===== MESSAGING =====

/// Signals sent on a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicSignal {
    HangUp(u32),
    Ringing(u32),
}

/// Topic that records the call signals sent on it
#[derive(Debug)]
pub struct MockTopic {
    name: String,
    display_name: Option<String>,
    signals: Mutex<Vec<TopicSignal>>,
    detached: Mutex<bool>,
}

impl MockTopic {
    pub fn new(name: impl Into<String>, display_name: Option<&str>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.map(str::to_string),
            signals: Mutex::new(Vec::new()),
            detached: Mutex::new(false),
        }
    }

    /// Make signals fail as on a topic that is not attached
    pub fn detach(&self, detached: bool) {
        *self.detached.lock() = detached;
    }

    fn record(&self, signal: TopicSignal) -> CallResult<()> {
        if *self.detached.lock() {
            return Err(CallError::signal_failed(format!("topic {} not attached", self.name)));
        }
        self.signals.lock().push(signal);
        Ok(())
    }

    pub fn signals(&self) -> Vec<TopicSignal> {
        self.signals.lock().clone()
    }
}

#[async_trait]
impl CallTopic for MockTopic {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> Option<String> {
        self.display_name.clone()
    }

    async fn video_call_hang_up(&self, seq: u32) -> CallResult<()> {
        self.record(TopicSignal::HangUp(seq))
    }

    async fn video_call_ringing(&self, seq: u32) -> CallResult<()> {
        self.record(TopicSignal::Ringing(seq))
    }
}

/// Messaging session with a fixed identity and a set of live topics
#[derive(Debug, Default)]
pub struct MockMessagingSession {
    my_id: Option<String>,
    display_name: Option<String>,
    topics: Mutex<HashMap<String, Arc<MockTopic>>>,
}

impl MockMessagingSession {
    pub fn new(my_id: Option<&str>, display_name: Option<&str>) -> Self {
        Self {
            my_id: my_id.map(str::to_string),
            display_name: display_name.map(str::to_string),
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Add a live topic and return it for later assertions
    pub fn add_topic(&self, name: &str, display_name: Option<&str>) -> Arc<MockTopic> {
        let topic = Arc::new(MockTopic::new(name, display_name));
        self.topics.lock().insert(name.to_string(), topic.clone());
        topic
    }
}

#[async_trait]
impl MessagingSession for MockMessagingSession {
    fn my_id(&self) -> Option<String> {
        self.my_id.clone()
    }

    fn my_display_name(&self) -> Option<String> {
        self.display_name.clone()
    }

    async fn topic(&self, name: &str) -> Option<Arc<dyn CallTopic>> {
        self.topics
            .lock()
            .get(name)
            .cloned()
            .map(|t| t as Arc<dyn CallTopic>)
    }
}

// ===== UI =====

/// Requests made to the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiRequest {
    OutgoingCall { topic: String, audio_only: bool },
    Settings(SettingsScreen),
    Notice(UserNotice),
}

/// Recording UI layer
#[derive(Debug, Default)]
pub struct MockCallUi {
    requests: Mutex<Vec<UiRequest>>,
}

impl MockCallUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<UiRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CallUi for MockCallUi {
    async fn show_outgoing_call(&self, topic: &str, audio_only: bool) {
        self.requests.lock().push(UiRequest::OutgoingCall {
            topic: topic.to_string(),
            audio_only,
        });
    }

    async fn open_settings(&self, screen: SettingsScreen) {
        self.requests.lock().push(UiRequest::Settings(screen));
    }

    async fn notify_user(&self, notice: UserNotice) {
        self.requests.lock().push(UiRequest::Notice(notice));
    }
}
