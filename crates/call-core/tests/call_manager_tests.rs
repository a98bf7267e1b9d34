//! Integration tests for calling-account registration, call placement and
//! call acceptance, run against the recording platform mocks.

use std::collections::HashMap;
use std::sync::Arc;

use rcall_call_core::platform::mock::{
    MockCallUi, MockConnection, MockMessagingSession, MockNotifications, MockPermissions,
    MockTelecom, TopicSignal, UiRequest,
};
use rcall_call_core::types::{
    CallExtras, DisconnectCause, Permission, SettingsScreen, TelecomCapabilities, UserNotice,
    VideoState,
};
use rcall_call_core::{
    CallConfig, CallError, CallIntent, CallIntentAction, CallManager, CallPlatform, CallRegistry,
    CallSignalHandler, HangUpReceiver, LocalBroadcast, SignalOutcome,
};
use serial_test::serial;
use tokio::sync::broadcast::error::TryRecvError;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rcall_call_core=debug")
        .with_test_writer()
        .try_init();
}

struct Harness {
    telecom: Arc<MockTelecom>,
    notifications: Arc<MockNotifications>,
    permissions: Arc<MockPermissions>,
    messaging: Arc<MockMessagingSession>,
    ui: Arc<MockCallUi>,
    registry: Arc<CallRegistry>,
    bus: LocalBroadcast,
}

impl Harness {
    fn new() -> Self {
        Self::with_capabilities(TelecomCapabilities::modern())
    }

    fn with_capabilities(capabilities: TelecomCapabilities) -> Self {
        Self::with_identity(capabilities, Some("usrMe"), Some("Alice"))
    }

    fn with_identity(
        capabilities: TelecomCapabilities,
        my_id: Option<&str>,
        display_name: Option<&str>,
    ) -> Self {
        Self {
            telecom: Arc::new(MockTelecom::new(capabilities)),
            notifications: Arc::new(MockNotifications::new()),
            permissions: Arc::new(MockPermissions::all_granted()),
            messaging: Arc::new(MockMessagingSession::new(my_id, display_name)),
            ui: Arc::new(MockCallUi::new()),
            registry: Arc::new(CallRegistry::new()),
            bus: LocalBroadcast::default(),
        }
    }

    fn platform(&self, manufacturer: &str) -> CallPlatform {
        CallPlatform {
            telecom: self.telecom.clone(),
            notifications: self.notifications.clone(),
            permissions: self.permissions.clone(),
            messaging: self.messaging.clone(),
            ui: self.ui.clone(),
            manufacturer: manufacturer.to_string(),
        }
    }

    async fn try_manager_on(&self, manufacturer: &str) -> Result<CallManager, CallError> {
        CallManager::new(
            CallConfig::default(),
            self.platform(manufacturer),
            self.registry.clone(),
            self.bus.clone(),
        )
        .await
    }

    async fn manager_on(&self, manufacturer: &str) -> CallManager {
        self.try_manager_on(manufacturer).await.unwrap()
    }

    async fn manager(&self) -> CallManager {
        self.manager_on("Google").await
    }
}

// ===== REGISTRATION =====

#[tokio::test]
#[serial]
async fn test_registers_self_managed_account() {
    init_tracing();

    let h = Harness::new();
    let manager = h.manager().await;

    let accounts = h.telecom.registered_accounts();
    assert_eq!(accounts.len(), 1);
    let account = &accounts[0];
    assert_eq!(account.handle.component, "CallConnectionService");
    assert_eq!(account.handle.id, "usrMe");
    assert_eq!(account.label, "Alice");
    assert_eq!(account.address, "tinode:usrMe");
    assert_eq!(account.subscription_address, "tinode:usrMe");
    assert_eq!(account.supported_uri_schemes, vec!["tinode".to_string()]);
    assert!(account.capabilities.video_calling);
    assert!(account.capabilities.supports_video_calling);
    assert!(account.capabilities.self_managed);

    assert_eq!(manager.account_handle(), &account.handle);
    assert_eq!(&manager.registration().account, account);
}

#[tokio::test]
#[serial]
async fn test_registration_on_older_platform() {
    init_tracing();

    let capabilities = TelecomCapabilities {
        requires_self_managed_declaration: false,
        ..TelecomCapabilities::modern()
    };
    let h = Harness::with_identity(capabilities, Some("usrMe"), None);
    h.manager().await;

    let account = &h.telecom.registered_accounts()[0];
    assert_eq!(account.label, "Current user");
    assert!(!account.capabilities.self_managed);
}

#[tokio::test]
#[serial]
async fn test_registration_requires_local_user() {
    init_tracing();

    let h = Harness::with_identity(TelecomCapabilities::modern(), None, None);
    let err = h.try_manager_on("Google").await.err().unwrap();
    assert_eq!(err, CallError::MissingConfiguration { field: "my_id".into() });
    assert!(h.telecom.registered_accounts().is_empty());
}

#[tokio::test]
#[serial]
async fn test_registration_failure_is_returned() {
    init_tracing();

    let h = Harness::new();
    h.telecom.fail_registration(CallError::unsupported("registerPhoneAccount"));
    let err = h.try_manager_on("Google").await.err().unwrap();
    assert_eq!(err.category(), "platform");
}

#[tokio::test]
#[serial]
async fn test_unregister_calling_account() {
    init_tracing();

    let h = Harness::new();
    let manager = h.manager().await;
    manager.unregister_calling_account().await;
    assert_eq!(h.telecom.unregistered_accounts(), vec![manager.account_handle().clone()]);
}

// ===== OUTGOING =====

#[tokio::test]
#[serial]
async fn test_outgoing_video_call_goes_through_telecom() {
    init_tracing();

    let h = Harness::new();
    let manager = h.manager().await;

    manager.place_outgoing_call("usrBob", false).await;

    let placed = h.telecom.placed_calls();
    assert_eq!(placed.len(), 1);
    let (address, request) = &placed[0];
    assert_eq!(address, "tinode:usrBob");
    assert_eq!(request.video_state, Some(VideoState::Bidirectional));
    assert!(request.start_with_speakerphone);
    assert_eq!(request.extras.topic, "usrBob");
    assert_eq!(request.extras.seq, None);
    assert!(!request.extras.audio_only);

    // The session appears once telephony creates the connection.
    assert!(!h.registry.is_call_in_progress().await);
    manager
        .on_outgoing_connection_created(&request.extras, Arc::new(MockConnection::new()))
        .await;

    let session = h.registry.current().await.unwrap();
    assert_eq!(session.topic(), "usrBob");
    assert!(!session.seq().is_assigned());
    assert_eq!(
        h.ui.requests(),
        vec![UiRequest::OutgoingCall { topic: "usrBob".into(), audio_only: false }]
    );
}

#[tokio::test]
#[serial]
async fn test_outgoing_audio_call_uses_default_video_state() {
    init_tracing();

    let h = Harness::new();
    let manager = h.manager().await;

    manager.place_outgoing_call("usrBob", true).await;

    let (_, request) = &h.telecom.placed_calls()[0];
    assert_eq!(request.video_state, None);
    assert!(!request.start_with_speakerphone);
    assert!(request.extras.audio_only);
}

#[tokio::test]
#[serial]
async fn test_outgoing_bypass_without_permission() {
    init_tracing();

    let h = Harness::new();
    let manager = h.manager().await;
    h.permissions.revoke(Permission::ManageOwnCalls);

    manager.place_outgoing_call("usrBob", true).await;

    assert!(h.telecom.placed_calls().is_empty());
    assert_eq!(h.registry.current().await.unwrap().topic(), "usrBob");
    assert_eq!(
        h.ui.requests(),
        vec![UiRequest::OutgoingCall { topic: "usrBob".into(), audio_only: true }]
    );
}

#[tokio::test]
#[serial]
async fn test_outgoing_bypass_when_permission_query_unavailable() {
    init_tracing();

    let h = Harness::with_capabilities(TelecomCapabilities::without_outgoing_query());
    let manager = h.manager().await;

    manager.place_outgoing_call("usrBob", false).await;

    assert!(h.telecom.placed_calls().is_empty());
    assert!(h.registry.is_call_in_progress().await);
}

#[tokio::test]
#[serial]
async fn test_outgoing_bypass_when_not_permitted() {
    init_tracing();

    let h = Harness::new();
    let manager = h.manager().await;
    h.telecom.permit_outgoing(false);

    manager.place_outgoing_call("usrBob", false).await;

    assert!(h.telecom.placed_calls().is_empty());
    assert!(h.registry.is_call_in_progress().await);
}

#[tokio::test]
#[serial]
async fn test_outgoing_failure_is_reported_to_user() {
    init_tracing();

    let h = Harness::new();
    let manager = h.manager().await;
    h.telecom.fail_place_call(CallError::security_rejected("CALL_PHONE"));

    manager.place_outgoing_call("usrBob", false).await;

    assert!(!h.registry.is_call_in_progress().await);
    assert_eq!(h.ui.requests(), vec![UiRequest::Notice(UserNotice::UnableToPlaceCall)]);
}

// ===== INCOMING =====

#[tokio::test]
#[serial]
async fn test_incoming_call_goes_through_telecom() {
    init_tracing();

    let h = Harness::new();
    let bob = h.messaging.add_topic("usrBob", Some("Bob"));
    let manager = h.manager().await;

    manager.accept_incoming_call("usrBob", 42, true).await.unwrap();

    let requests = h.telecom.incoming_calls();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].address, "tinode:usrBob");
    assert_eq!(requests[0].video_state, VideoState::AudioOnly);
    assert!(!requests[0].start_with_speakerphone);
    assert_eq!(
        requests[0].extras,
        CallExtras { topic: "usrBob".into(), seq: Some(42), audio_only: true }
    );
    assert_eq!(bob.signals(), vec![TopicSignal::Ringing(42)]);

    // Telephony creates the connection and asks for the incoming UI.
    let conn = Arc::new(MockConnection::new());
    manager
        .on_incoming_connection_created(&requests[0].extras, conn.clone())
        .await
        .unwrap();

    let session = h.registry.current().await.unwrap();
    assert!(session.matches("usrBob", 42));
    assert_eq!(conn.set_active_count(), 1);

    let posted = h.notifications.posted();
    assert_eq!(posted.len(), 1);
    let notification = &posted[0];
    assert_eq!(notification.tag, "incoming_call");
    assert_eq!(notification.id, 0);
    assert_eq!(notification.caller_name, "Bob");
    assert!(notification.audio_only);
    assert_eq!(notification.ask_user.action, CallIntentAction::Incoming);
    assert!(!notification.ask_user.accepted);
    assert!(notification.answer.accepted);
    assert_eq!(notification.decline.action, CallIntentAction::Close);
    assert_eq!(notification.decline.seq, Some(42));
}

#[tokio::test]
#[serial]
async fn test_incoming_video_call_requests_bidirectional_video() {
    init_tracing();

    let h = Harness::new();
    h.messaging.add_topic("usrBob", Some("Bob"));
    let manager = h.manager().await;

    manager.accept_incoming_call("usrBob", 7, false).await.unwrap();

    let request = &h.telecom.incoming_calls()[0];
    assert_eq!(request.video_state, VideoState::Bidirectional);
    assert!(request.start_with_speakerphone);
}

#[tokio::test]
#[serial]
async fn test_second_incoming_call_gets_busy_hang_up() {
    init_tracing();

    let h = Harness::new();
    let carol = h.messaging.add_topic("usrCarol", None);
    let manager = h.manager().await;

    h.registry.prepare_new_call("usrBob", Arc::new(MockConnection::new())).await.unwrap();
    h.registry.set_call_active("usrBob", 42).await.unwrap();

    manager.accept_incoming_call("usrCarol", 7, false).await.unwrap();

    assert_eq!(carol.signals(), vec![TopicSignal::HangUp(7)]);
    assert!(h.telecom.incoming_calls().is_empty());
    assert!(h.registry.current().await.unwrap().matches("usrBob", 42));
}

/// A busy hang-up for a second call must not end the first one when the
/// server echoes it back as a push signal.
#[tokio::test]
#[serial]
async fn test_busy_second_call_then_push_keeps_first_call() {
    init_tracing();

    let h = Harness::new();
    h.messaging.add_topic("grp1", None);
    let bob = h.messaging.add_topic("usrB", None);
    let manager = h.manager().await;
    let signals = CallSignalHandler::new(h.registry.clone(), h.bus.clone());
    let receiver = HangUpReceiver::new(
        h.notifications.clone(),
        h.messaging.clone(),
        h.registry.clone(),
        CallConfig::default(),
    );

    let conn = Arc::new(MockConnection::new());
    h.registry.prepare_new_call("grp1", conn.clone()).await.unwrap();
    h.registry.set_call_active("grp1", 42).await.unwrap();

    manager.accept_incoming_call("usrB", 7, false).await.unwrap();
    assert_eq!(bob.signals(), vec![TopicSignal::HangUp(7)]);

    let data: HashMap<String, String> =
        [("webrtc", "busy"), ("topic", "usrB"), ("seq", "8"), ("replace", ":7")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
    assert_eq!(signals.handle(&data).await, SignalOutcome::OtherCall);

    // A close intent for the rejected call arriving any other way.
    receiver.on_receive(&CallIntent::close("usrB", 7)).await;

    assert!(h.registry.current().await.unwrap().matches("grp1", 42));
    assert!(conn.disconnects().is_empty());
    assert_eq!(conn.destroy_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_duplicate_incoming_call_is_ignored() {
    init_tracing();

    let h = Harness::new();
    let bob = h.messaging.add_topic("usrBob", None);
    let manager = h.manager().await;

    h.registry.prepare_new_call("usrBob", Arc::new(MockConnection::new())).await.unwrap();
    h.registry.set_call_active("usrBob", 42).await.unwrap();

    manager.accept_incoming_call("usrBob", 42, false).await.unwrap();

    assert!(bob.signals().is_empty());
    assert!(h.telecom.incoming_calls().is_empty());
    assert!(h.notifications.posted().is_empty());
}

#[tokio::test]
#[serial]
async fn test_incoming_call_from_unknown_topic() {
    init_tracing();

    let h = Harness::new();
    let manager = h.manager().await;

    manager.accept_incoming_call("usrNobody", 5, false).await.unwrap();

    assert!(h.telecom.incoming_calls().is_empty());
    assert!(!h.registry.is_call_in_progress().await);
}

#[tokio::test]
#[serial]
async fn test_incoming_bypass_without_permission() {
    init_tracing();

    let h = Harness::new();
    let bob = h.messaging.add_topic("usrBob", None);
    let manager = h.manager().await;
    h.permissions.revoke(Permission::ManageOwnCalls);

    manager.accept_incoming_call("usrBob", 42, false).await.unwrap();

    assert!(h.telecom.incoming_calls().is_empty());
    let session = h.registry.current().await.unwrap();
    assert!(session.matches("usrBob", 42));
    assert!(session.is_connected().await);

    let posted = h.notifications.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].caller_name, "Unknown");
    assert_eq!(bob.signals(), vec![TopicSignal::Ringing(42)]);
}

#[tokio::test]
#[serial]
async fn test_incoming_call_without_seq_leaves_no_session() {
    init_tracing();

    let h = Harness::new();
    let bob = h.messaging.add_topic("usrB", None);
    h.messaging.add_topic("usrC", None);
    let manager = h.manager().await;
    h.permissions.revoke(Permission::ManageOwnCalls);

    manager.accept_incoming_call("usrB", 0, false).await.unwrap();

    assert!(!h.registry.is_call_in_progress().await);
    assert!(bob.signals().is_empty());
    assert!(h.notifications.posted().is_empty());

    // The next call is not answered busy.
    manager.accept_incoming_call("usrC", 5, false).await.unwrap();
    assert!(h.registry.current().await.unwrap().matches("usrC", 5));
}

#[tokio::test]
#[serial]
async fn test_incoming_connection_without_seq_is_released() {
    init_tracing();

    let h = Harness::new();
    h.messaging.add_topic("usrB", None);
    let manager = h.manager().await;

    for seq in [None, Some(0)] {
        let conn = Arc::new(MockConnection::new());
        let extras = CallExtras { topic: "usrB".into(), seq, audio_only: false };
        manager.on_incoming_connection_created(&extras, conn.clone()).await.unwrap();

        assert!(!h.registry.is_call_in_progress().await, "{seq:?}");
        assert_eq!(conn.disconnects(), vec![DisconnectCause::Error]);
        assert_eq!(conn.destroy_count(), 1);
    }
    assert!(h.notifications.posted().is_empty());

    let extras = CallExtras { topic: "usrB".into(), seq: Some(5), audio_only: false };
    manager
        .on_incoming_connection_created(&extras, Arc::new(MockConnection::new()))
        .await
        .unwrap();
    assert!(h.registry.current().await.unwrap().matches("usrB", 5));
}

#[tokio::test]
#[serial]
async fn test_incoming_connection_from_unknown_topic_is_released() {
    init_tracing();

    let h = Harness::new();
    let manager = h.manager().await;

    let conn = Arc::new(MockConnection::new());
    let extras = CallExtras { topic: "usrNobody".into(), seq: Some(5), audio_only: false };
    manager.on_incoming_connection_created(&extras, conn.clone()).await.unwrap();

    assert!(!h.registry.is_call_in_progress().await);
    assert_eq!(conn.disconnects(), vec![DisconnectCause::Error]);
    assert_eq!(conn.destroy_count(), 1);
}

#[tokio::test]
#[serial]
async fn test_incoming_call_rings_without_notification_permission() {
    init_tracing();

    let h = Harness::new();
    let bob = h.messaging.add_topic("usrBob", None);
    let manager = h.manager().await;
    h.permissions.revoke(Permission::ManageOwnCalls);
    h.notifications.deny_posting(true);

    manager.accept_incoming_call("usrBob", 42, false).await.unwrap();

    assert!(h.notifications.posted().is_empty());
    assert!(h.registry.current().await.unwrap().matches("usrBob", 42));
    assert_eq!(bob.signals(), vec![TopicSignal::Ringing(42)]);
}

#[tokio::test]
#[serial]
async fn test_incoming_bypass_when_not_permitted() {
    init_tracing();

    let h = Harness::new();
    h.messaging.add_topic("usrBob", Some("Bob"));
    let manager = h.manager().await;
    h.telecom.permit_incoming(false);

    manager.accept_incoming_call("usrBob", 42, false).await.unwrap();

    assert!(h.telecom.incoming_calls().is_empty());
    assert!(h.registry.current().await.unwrap().matches("usrBob", 42));
}

#[tokio::test]
#[serial]
async fn test_security_rejection_on_vendor_device() {
    init_tracing();

    let h = Harness::new();
    let bob = h.messaging.add_topic("usrBob", Some("Bob"));
    let manager = h.manager_on("Xiaomi").await;
    h.telecom.fail_incoming_call(CallError::security_rejected("not allowed"));

    manager.accept_incoming_call("usrBob", 42, false).await.unwrap();

    assert_eq!(
        h.ui.requests(),
        vec![UiRequest::Settings(SettingsScreen::Vendor { manufacturer: "Xiaomi".into() })]
    );
    // Falls back to the in-app call UI.
    assert!(h.registry.current().await.unwrap().matches("usrBob", 42));
    assert_eq!(h.notifications.posted().len(), 1);
    assert_eq!(bob.signals(), vec![TopicSignal::Ringing(42)]);
}

#[tokio::test]
#[serial]
async fn test_security_rejection_on_other_device() {
    init_tracing();

    let h = Harness::new();
    h.messaging.add_topic("usrBob", Some("Bob"));
    let manager = h.manager_on("samsung").await;
    h.telecom.fail_incoming_call(CallError::security_rejected("not allowed"));

    manager.accept_incoming_call("usrBob", 42, false).await.unwrap();

    assert_eq!(h.ui.requests(), vec![UiRequest::Settings(SettingsScreen::CallingAccounts)]);
    assert!(h.registry.is_call_in_progress().await);
}

#[tokio::test]
#[serial]
async fn test_other_incoming_failure_is_absorbed() {
    init_tracing();

    let h = Harness::new();
    let bob = h.messaging.add_topic("usrBob", Some("Bob"));
    let manager = h.manager().await;
    h.telecom.fail_incoming_call(CallError::platform("telecom unavailable"));

    manager.accept_incoming_call("usrBob", 42, false).await.unwrap();

    assert!(!h.registry.is_call_in_progress().await);
    assert!(bob.signals().is_empty());
    assert!(h.ui.requests().is_empty());
}

#[tokio::test]
#[serial]
async fn test_incoming_ui_rejects_session_reuse() {
    init_tracing();

    let h = Harness::new();
    h.messaging.add_topic("usrBob", Some("Bob"));
    let manager = h.manager().await;

    h.registry.prepare_new_call("usrBob", Arc::new(MockConnection::new())).await.unwrap();
    h.registry.set_call_active("usrBob", 42).await.unwrap();

    let err = manager.show_incoming_call_ui("usrBob", 43, false).await.unwrap_err();
    assert!(matches!(err, CallError::InvalidSessionState { seq: 42, .. }));
    assert!(h.notifications.posted().is_empty());
}

#[tokio::test]
#[serial]
async fn test_dismiss_incoming_call_only_for_current_call() {
    init_tracing();

    let h = Harness::new();
    let manager = h.manager().await;
    let mut rx = h.bus.subscribe();

    h.registry.prepare_new_call("usrBob", Arc::new(MockConnection::new())).await.unwrap();
    h.registry.set_call_active("usrBob", 42).await.unwrap();

    manager.dismiss_incoming_call("usrBob", 41).await;
    manager.dismiss_incoming_call("usrCarol", 42).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    manager.dismiss_incoming_call("usrBob", 42).await;
    let intent = rx.try_recv().unwrap();
    assert_eq!(intent.action, CallIntentAction::Close);
    assert_eq!(intent.topic.as_deref(), Some("usrBob"));
    assert_eq!(intent.seq, Some(42));
}
