//! Call intents and call lifecycle events
//!
//! Two channels connect the pieces of the call layer:
//!
//! - [`LocalBroadcast`] carries [`CallIntent`]s, the in-process "close this
//!   call" style signals sent by the call manager and the push handler and
//!   consumed by the [`HangUpReceiver`](crate::HangUpReceiver).
//! - [`CallEvent`]s are published by the [`CallRegistry`](crate::CallRegistry)
//!   whenever the process-wide call session changes, for UI integration.
//!
//! ```rust
//! use rcall_call_core::{CallIntent, CallIntentAction, LocalBroadcast};
//!
//! # tokio_test::block_on(async {
//! let bus = LocalBroadcast::new(8);
//! let mut rx = bus.subscribe();
//! bus.send(CallIntent::close("grp1", 42));
//!
//! let intent = rx.recv().await.unwrap();
//! assert_eq!(intent.action, CallIntentAction::Close);
//! assert_eq!(intent.seq, Some(42));
//! # });
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// What a [`CallIntent`] asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallIntentAction {
    /// Hang up or decline the call
    Close,
    /// Show the incoming call screen
    Incoming,
    /// Start an outgoing call screen
    Start,
}

/// In-process signal about one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallIntent {
    pub action: CallIntentAction,
    pub topic: Option<String>,
    /// Sequence id of the call invite, when known
    pub seq: Option<u32>,
    pub audio_only: bool,
    /// The user already accepted the call (answer action)
    pub accepted: bool,
}

impl CallIntent {
    pub fn new(action: CallIntentAction) -> Self {
        Self {
            action,
            topic: None,
            seq: None,
            audio_only: false,
            accepted: false,
        }
    }

    /// Hang up / decline the call `(topic, seq)`
    pub fn close(topic: impl Into<String>, seq: u32) -> Self {
        Self::new(CallIntentAction::Close).with_topic(topic).with_seq(seq)
    }

    /// Show the incoming call UI for `(topic, seq)`
    pub fn incoming(topic: impl Into<String>, seq: u32, audio_only: bool) -> Self {
        Self::new(CallIntentAction::Incoming)
            .with_topic(topic)
            .with_seq(seq)
            .with_audio_only(audio_only)
    }

    /// Open the outgoing call UI for `topic`
    pub fn start(topic: impl Into<String>, audio_only: bool) -> Self {
        Self::new(CallIntentAction::Start).with_topic(topic).with_audio_only(audio_only)
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_seq(mut self, seq: u32) -> Self {
        self.seq = Some(seq);
        self
    }

    pub fn with_audio_only(mut self, audio_only: bool) -> Self {
        self.audio_only = audio_only;
        self
    }

    pub fn with_accepted(mut self, accepted: bool) -> Self {
        self.accepted = accepted;
        self
    }
}

/// In-process broadcast bus for [`CallIntent`]s
#[derive(Debug, Clone)]
pub struct LocalBroadcast {
    sender: broadcast::Sender<CallIntent>,
}

impl LocalBroadcast {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver `intent` to all current subscribers. Returns how many received it.
    pub fn send(&self, intent: CallIntent) -> usize {
        match self.sender.send(intent) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(intent)) => {
                debug!(action = ?intent.action, "No receivers for call intent");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallIntent> {
        self.sender.subscribe()
    }
}

impl Default for LocalBroadcast {
    fn default() -> Self {
        Self::new(16)
    }
}

/// Change of the process-wide call session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallEvent {
    /// A session was created for an outgoing or incoming call
    SessionPrepared {
        event_id: Uuid,
        topic: String,
        seq: u32,
        timestamp: DateTime<Utc>,
    },
    /// The session was bound to its invite seq and marked active
    SessionActive {
        event_id: Uuid,
        topic: String,
        seq: u32,
        timestamp: DateTime<Utc>,
    },
    /// The session was ended and its connection released
    SessionEnded {
        event_id: Uuid,
        topic: String,
        seq: u32,
        timestamp: DateTime<Utc>,
    },
}

impl CallEvent {
    pub fn prepared(topic: impl Into<String>, seq: u32) -> Self {
        CallEvent::SessionPrepared {
            event_id: Uuid::new_v4(),
            topic: topic.into(),
            seq,
            timestamp: Utc::now(),
        }
    }

    pub fn active(topic: impl Into<String>, seq: u32) -> Self {
        CallEvent::SessionActive {
            event_id: Uuid::new_v4(),
            topic: topic.into(),
            seq,
            timestamp: Utc::now(),
        }
    }

    pub fn ended(topic: impl Into<String>, seq: u32) -> Self {
        CallEvent::SessionEnded {
            event_id: Uuid::new_v4(),
            topic: topic.into(),
            seq,
            timestamp: Utc::now(),
        }
    }

    /// Topic the event refers to
    pub fn topic(&self) -> &str {
        match self {
            CallEvent::SessionPrepared { topic, .. }
            | CallEvent::SessionActive { topic, .. }
            | CallEvent::SessionEnded { topic, .. } => topic,
        }
    }

    /// Invite seq at the time of the event, 0 if unassigned
    pub fn seq(&self) -> u32 {
        match self {
            CallEvent::SessionPrepared { seq, .. }
            | CallEvent::SessionActive { seq, .. }
            | CallEvent::SessionEnded { seq, .. } => *seq,
        }
    }
}
