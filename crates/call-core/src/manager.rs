//! Call manager: calling-account registration and call placement
//!
//! [`CallManager`] registers the local user as a self-managed calling account
//! and routes outgoing and incoming calls through the platform telephony
//! framework. When the framework cannot be used (missing permission, the
//! platform cannot answer "is this call permitted", or the account is not
//! permitted right now) the call is handled in-app instead.
//!
//! # Call Flow
//!
//! ```text
//! place_outgoing_call ──► bypass? ──yes──► in-app connection + outgoing UI
//!                            │
//!                            └─no──► TelecomService::place_call
//!                                       └─► on_outgoing_connection_created
//!
//! accept_incoming_call ──► no seq / busy / duplicate / unknown topic? ──► stop
//!                            │
//!                            ├─ bypass? ──yes──► in-app connection + incoming notification
//!                            │
//!                            └─no──► TelecomService::add_new_incoming_call
//!                                       ├─ ok ──► ringing
//!                                       └─ security rejection ──► settings screen + in-app
//! ```
//!
//! Platform failures are logged and absorbed: a failed call setup leaves the
//! app usable with no call, it never surfaces as an error. The one error
//! returned to callers is [`CallError::InvalidSessionState`] (session reuse).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::CallConfig;
use crate::error::{CallError, CallResult};
use crate::events::{CallIntent, LocalBroadcast};
use crate::platform::{
    CallConnection, CallTopic, CallUi, InAppConnection, MessagingSession, NotificationService,
    PermissionChecker, TelecomService,
};
use crate::registry::CallRegistry;
use crate::types::{
    AccountCapabilities, CallExtras, DisconnectCause, IncomingCallNotification,
    IncomingCallRequest, OutgoingCallRequest, Permission, PhoneAccount, PhoneAccountHandle,
    SettingsScreen, UserNotice, VideoState,
};

/// Platform collaborators used by the call manager
#[derive(Clone)]
pub struct CallPlatform {
    pub telecom: Arc<dyn TelecomService>,
    pub notifications: Arc<dyn NotificationService>,
    pub permissions: Arc<dyn PermissionChecker>,
    pub messaging: Arc<dyn MessagingSession>,
    pub ui: Arc<dyn CallUi>,
    /// Device manufacturer as reported by the platform
    pub manufacturer: String,
}

/// The local user's calling account, registered for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneAccountRegistration {
    pub account: PhoneAccount,
    pub registered_at: DateTime<Utc>,
}

impl PhoneAccountRegistration {
    pub fn handle(&self) -> &PhoneAccountHandle {
        &self.account.handle
    }
}

/// Mediates calls between the app and the platform telephony framework
pub struct CallManager {
    config: CallConfig,
    platform: CallPlatform,
    registry: Arc<CallRegistry>,
    bus: LocalBroadcast,
    registration: PhoneAccountRegistration,
}

impl CallManager {
    /// Register the local user's calling account and create the manager.
    ///
    /// Fails when the local user id is unknown or the account cannot be
    /// registered; without an account the app cannot use telephony at all.
    pub async fn new(
        config: CallConfig,
        platform: CallPlatform,
        registry: Arc<CallRegistry>,
        bus: LocalBroadcast,
    ) -> CallResult<Self> {
        config.validate()?;

        let my_id = platform
            .messaging
            .my_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CallError::MissingConfiguration { field: "my_id".to_string() })?;

        let label = platform
            .messaging
            .my_display_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| config.default_account_label.clone());

        let capabilities = AccountCapabilities {
            video_calling: true,
            supports_video_calling: true,
            self_managed: platform.telecom.capabilities().requires_self_managed_declaration,
        };

        let address = config.address_for(&my_id);
        let account = PhoneAccount {
            handle: PhoneAccountHandle {
                component: config.connection_component.clone(),
                id: my_id,
            },
            short_description: label.clone(),
            label,
            subscription_address: address.clone(),
            address,
            supported_uri_schemes: vec![config.uri_scheme.clone()],
            capabilities,
        };

        platform.telecom.register_phone_account(&account).await?;
        info!(account = %account.handle, label = %account.label, "Calling account registered");

        Ok(Self {
            config,
            platform,
            registry,
            bus,
            registration: PhoneAccountRegistration {
                account,
                registered_at: Utc::now(),
            },
        })
    }

    pub fn config(&self) -> &CallConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CallRegistry> {
        &self.registry
    }

    pub fn registration(&self) -> &PhoneAccountRegistration {
        &self.registration
    }

    pub fn account_handle(&self) -> &PhoneAccountHandle {
        self.registration.handle()
    }

    /// Remove the calling account, e.g. on logout. Best-effort.
    pub async fn unregister_calling_account(&self) {
        if let Err(e) = self.platform.telecom.unregister_phone_account(self.account_handle()).await {
            debug!(error = %e, "Ignoring failure to unregister calling account");
        }
    }

    // ===== OUTGOING =====

    /// Place an outgoing call to `callee`.
    ///
    /// Video calls start bidirectional with the speakerphone on. Failures are
    /// logged and reported to the user; nothing is returned.
    pub async fn place_outgoing_call(&self, callee: &str, audio_only: bool) {
        if self.should_bypass_telecom(true).await {
            debug!(callee, "Placing call without telephony framework");
            self.show_outgoing_call_ui(callee, audio_only, Arc::new(InAppConnection::new()))
                .await;
            return;
        }

        let request = OutgoingCallRequest {
            account: self.account_handle().clone(),
            video_state: (!audio_only).then_some(VideoState::Bidirectional),
            start_with_speakerphone: !audio_only,
            extras: CallExtras {
                topic: callee.to_string(),
                seq: None,
                audio_only,
            },
        };

        let address = self.config.address_for(callee);
        match self.platform.telecom.place_call(&address, &request).await {
            Ok(()) => info!(callee, audio_only, "Outgoing call placed"),
            Err(e) => {
                warn!(callee, error = %e, "Unable to place call");
                self.platform.ui.notify_user(UserNotice::UnableToPlaceCall).await;
            }
        }
    }

    /// Telephony created the connection for an outgoing call
    pub async fn on_outgoing_connection_created(
        &self,
        extras: &CallExtras,
        connection: Arc<dyn CallConnection>,
    ) {
        self.show_outgoing_call_ui(&extras.topic, extras.audio_only, connection).await;
    }

    /// Prepare the session for an outgoing call and open the call screen
    pub async fn show_outgoing_call_ui(
        &self,
        topic: &str,
        audio_only: bool,
        connection: Arc<dyn CallConnection>,
    ) {
        if let Err(e) = self.registry.prepare_new_call(topic, connection).await {
            warn!(topic, error = %e, "Cannot start outgoing call");
            return;
        }
        self.platform.ui.show_outgoing_call(topic, audio_only).await;
    }

    // ===== INCOMING =====

    /// Announce an incoming call from `caller` with invite `seq`.
    ///
    /// A second call while one is in progress is answered busy. Platform
    /// failures are absorbed; only session reuse is returned as an error.
    pub async fn accept_incoming_call(&self, caller: &str, seq: u32, audio_only: bool) -> CallResult<()> {
        if seq == 0 {
            warn!(topic = caller, "Incoming call without call seq");
            return Ok(());
        }

        if let Some(current) = self.registry.current().await {
            if current.matches(caller, seq) {
                warn!(topic = caller, seq, "Call already accepted");
                return Ok(());
            }
            // Busy: hang up the new call.
            info!(topic = caller, seq, current = %current.topic(), "Another call in progress, hanging up");
            if let Some(topic) = self.platform.messaging.topic(caller).await {
                Self::send_hang_up(topic.as_ref(), seq).await;
            }
            return Ok(());
        }

        let Some(topic) = self.platform.messaging.topic(caller).await else {
            warn!(topic = caller, "Call from an unknown topic");
            return Ok(());
        };

        if self.should_bypass_telecom(false).await {
            return self.accept_in_app(topic.as_ref(), seq, audio_only).await;
        }

        let request = IncomingCallRequest {
            address: self.config.address_for(caller),
            account: self.account_handle().clone(),
            video_state: VideoState::for_call(audio_only),
            start_with_speakerphone: !audio_only,
            extras: CallExtras {
                topic: caller.to_string(),
                seq: Some(seq),
                audio_only,
            },
        };

        match self.platform.telecom.add_new_incoming_call(&request).await {
            Ok(()) => {
                debug!(topic = caller, seq, "Incoming call handed to telephony");
                Self::send_ringing(topic.as_ref(), seq).await;
                Ok(())
            }
            Err(CallError::SecurityRejected { reason }) => {
                warn!(topic = caller, seq, %reason, "Telephony rejected incoming call");
                self.open_rejection_settings().await;
                self.accept_in_app(topic.as_ref(), seq, audio_only).await
            }
            Err(e) => {
                warn!(topic = caller, seq, error = %e, "Failed to accept incoming call");
                Ok(())
            }
        }
    }

    /// Telephony created the connection for an incoming call
    pub async fn on_incoming_connection_created(
        &self,
        extras: &CallExtras,
        connection: Arc<dyn CallConnection>,
    ) -> CallResult<()> {
        let Some(seq) = extras.seq.filter(|seq| *seq > 0) else {
            warn!(topic = %extras.topic, "Incoming connection without call seq");
            Self::release_connection(connection.as_ref()).await;
            return Ok(());
        };
        if self.platform.messaging.topic(&extras.topic).await.is_none() {
            warn!(topic = %extras.topic, "Incoming connection from an unknown topic");
            Self::release_connection(connection.as_ref()).await;
            return Ok(());
        }
        if let Err(e) = self.registry.prepare_new_call(&extras.topic, connection).await {
            warn!(topic = %extras.topic, error = %e, "Cannot take incoming call");
            return Ok(());
        }
        self.show_incoming_call_or_end(&extras.topic, seq, extras.audio_only).await
    }

    async fn release_connection(connection: &dyn CallConnection) {
        connection.set_disconnected(DisconnectCause::Error).await;
        connection.destroy().await;
    }

    /// Telephony failed to create a connection
    pub fn on_connection_creation_failed(&self, outgoing: bool) {
        if outgoing {
            info!("Create outgoing call failed");
        } else {
            info!("Create incoming call failed");
        }
    }

    async fn accept_in_app(&self, topic: &dyn CallTopic, seq: u32, audio_only: bool) -> CallResult<()> {
        let name = topic.name().to_string();
        if let Err(e) = self
            .registry
            .prepare_new_call(&name, Arc::new(InAppConnection::new()))
            .await
        {
            warn!(topic = %name, error = %e, "Cannot take incoming call");
            return Ok(());
        }
        self.show_incoming_call_or_end(&name, seq, audio_only).await?;
        Self::send_ringing(topic, seq).await;
        Ok(())
    }

    /// Show the incoming call for a just prepared session, ending the session on failure
    async fn show_incoming_call_or_end(&self, topic: &str, seq: u32, audio_only: bool) -> CallResult<()> {
        let result = self.show_incoming_call_ui(topic, seq, audio_only).await;
        if result.is_err() {
            self.registry.end_call_in_progress().await;
        }
        result
    }

    async fn open_rejection_settings(&self) {
        let screen = if self.config.is_vendor_fallback(&self.platform.manufacturer) {
            SettingsScreen::Vendor {
                manufacturer: self.platform.manufacturer.clone(),
            }
        } else {
            SettingsScreen::CallingAccounts
        };
        debug!(manufacturer = %self.platform.manufacturer, ?screen, "Routing user to settings");
        self.platform.ui.open_settings(screen).await;
    }

    /// Mark the call active and post the incoming-call notification.
    pub async fn show_incoming_call_ui(&self, topic_name: &str, seq: u32, audio_only: bool) -> CallResult<()> {
        let Some(topic) = self.platform.messaging.topic(topic_name).await else {
            warn!(topic = topic_name, "Call from an unknown topic");
            return Ok(());
        };

        let caller_name = topic
            .display_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.config.unknown_caller_label.clone());

        match self.registry.set_call_active(topic_name, seq).await {
            Ok(()) => {}
            Err(e) if e.is_usage_error() => return Err(e),
            Err(e) => warn!(topic = topic_name, seq, error = %e, "Call not marked active"),
        }

        let notification = IncomingCallNotification {
            tag: self.config.incoming_call_notification_tag.clone(),
            id: self.config.incoming_call_notification_id,
            topic: topic_name.to_string(),
            seq,
            caller_name,
            audio_only,
            ask_user: CallIntent::incoming(topic_name, seq, audio_only),
            answer: Self::answer_call_intent(topic_name, seq, audio_only),
            decline: Self::decline_intent(topic_name, seq),
        };
        if let Err(e) = self.platform.notifications.notify_incoming_call(notification).await {
            warn!(topic = topic_name, seq, error = %e, "Failed to post incoming call notification");
        }
        Ok(())
    }

    /// Dismiss the incoming call UI for `(topic, seq)` if it is the call in progress
    pub async fn dismiss_incoming_call(&self, topic: &str, seq: u32) {
        let Some(current) = self.registry.current().await else {
            return;
        };
        if !current.matches(topic, seq) {
            return;
        }
        self.bus.send(CallIntent::close(topic, seq));
    }

    /// Intent opening the call screen with the call already accepted
    pub fn answer_call_intent(topic: &str, seq: u32, audio_only: bool) -> CallIntent {
        CallIntent::incoming(topic, seq, audio_only).with_accepted(true)
    }

    /// Intent declining the call
    pub fn decline_intent(topic: &str, seq: u32) -> CallIntent {
        CallIntent::close(topic, seq)
    }

    // ===== HELPERS =====

    async fn should_bypass_telecom(&self, outgoing: bool) -> bool {
        if !self.platform.permissions.is_granted(Permission::ManageOwnCalls) {
            warn!("No permission {}", Permission::ManageOwnCalls);
            return true;
        }

        let telecom = &self.platform.telecom;
        let capabilities = telecom.capabilities();
        if outgoing {
            if !capabilities.outgoing_permission_query {
                return true;
            }
            return match telecom.is_outgoing_call_permitted(self.account_handle()).await {
                Ok(true) => false,
                Ok(false) => {
                    warn!("Account cannot place outgoing calls");
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Outgoing call permission query failed");
                    true
                }
            };
        }

        if !capabilities.incoming_permission_query {
            return false;
        }
        match telecom.is_incoming_call_permitted(self.account_handle()).await {
            Ok(true) => false,
            Ok(false) => {
                info!("Account cannot accept incoming calls");
                true
            }
            Err(e) => {
                warn!(error = %e, "Incoming call permission query failed");
                true
            }
        }
    }

    async fn send_hang_up(topic: &dyn CallTopic, seq: u32) {
        if let Err(e) = topic.video_call_hang_up(seq).await {
            warn!(topic = topic.name(), seq, error = %e, "Failed to send hang-up");
        }
    }

    async fn send_ringing(topic: &dyn CallTopic, seq: u32) {
        if let Err(e) = topic.video_call_ringing(seq).await {
            warn!(topic = topic.name(), seq, error = %e, "Failed to send ringing");
        }
    }
}
