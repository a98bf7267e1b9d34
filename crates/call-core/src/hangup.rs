//! Hang-up handling
//!
//! [`HangUpReceiver`] consumes [`CallIntent`]s from the in-process bus. Every
//! intent dismisses the incoming-call notification. A close intent also tells
//! the peer the call is over (when the call can be identified) and ends the
//! call in progress, unless the intent names a different call.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CallConfig;
use crate::events::{CallIntent, CallIntentAction};
use crate::platform::{MessagingSession, NotificationService};
use crate::registry::CallRegistry;

/// Receiver of call intents that tears calls down
pub struct HangUpReceiver {
    notifications: Arc<dyn NotificationService>,
    messaging: Arc<dyn MessagingSession>,
    registry: Arc<CallRegistry>,
    config: CallConfig,
}

impl HangUpReceiver {
    pub fn new(
        notifications: Arc<dyn NotificationService>,
        messaging: Arc<dyn MessagingSession>,
        registry: Arc<CallRegistry>,
        config: CallConfig,
    ) -> Self {
        Self {
            notifications,
            messaging,
            registry,
            config,
        }
    }

    /// Handle one intent.
    ///
    /// The notification is cancelled first for any intent. A close intent
    /// naming a call (topic and positive seq) on a topic in session sends the
    /// hang-up and ends the call in progress only if it is that call. Any
    /// other close intent ends the call in progress.
    pub async fn on_receive(&self, intent: &CallIntent) {
        self.notifications
            .cancel(
                &self.config.incoming_call_notification_tag,
                self.config.incoming_call_notification_id,
            )
            .await;

        if intent.action != CallIntentAction::Close {
            return;
        }

        let (Some(name), Some(seq)) = (intent.topic.as_deref(), intent.seq.filter(|s| *s > 0)) else {
            debug!(topic = ?intent.topic, seq = ?intent.seq, "Close intent does not identify a call");
            self.registry.end_call_in_progress().await;
            return;
        };

        let Some(topic) = self.messaging.topic(name).await else {
            debug!(topic = name, "Hang-up for a topic not in session");
            self.registry.end_call_in_progress().await;
            return;
        };

        if let Err(e) = topic.video_call_hang_up(seq).await {
            warn!(topic = name, seq, error = %e, "Failed to send hang-up");
        }
        if !self.registry.end_call_for(name, seq).await {
            debug!(topic = name, seq, "Close intent is not for the call in progress");
        }
    }

    /// Consume intents from `rx` on a background task until the bus closes
    pub fn listen(self: Arc<Self>, mut rx: broadcast::Receiver<CallIntent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(intent) => self.on_receive(&intent).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Hang-up receiver lagged behind call intents");
                    }
                    Err(RecvError::Closed) => {
                        info!("Call intent bus closed, hang-up receiver stopping");
                        break;
                    }
                }
            }
        })
    }
}
