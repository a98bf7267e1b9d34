//! Call session: one logical call bound to one platform connection
//!
//! A [`CallSession`] is identified by its topic and the sequence id of the
//! call-invite message. The sequence id is a single-assignment value modelled
//! by [`CallSeq`]: a session starts [`CallSeq::Unassigned`] and is bound once
//! to a positive seq when the call becomes active. Trying to bind an already
//! bound session to a different call is reported as
//! [`CallError::InvalidSessionState`].
//!
//! ```rust
//! use std::sync::Arc;
//! use rcall_call_core::{CallSession, CallError};
//! use rcall_call_core::platform::InAppConnection;
//!
//! # tokio_test::block_on(async {
//! let session = CallSession::new("grp1", Arc::new(InAppConnection::new()));
//! session.set_call_active("grp1", 42).await.unwrap();
//! assert!(session.matches("grp1", 42));
//!
//! let err = session.set_call_active("grp2", 43).await.unwrap_err();
//! assert!(matches!(err, CallError::InvalidSessionState { .. }));
//! # });
//! ```

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use rcall_audio_core::CallAudioRoute;

use crate::error::{CallError, CallResult};
use crate::platform::CallConnection;
use crate::types::{ConnectionState, DisconnectCause};

/// Sequence id of the call-invite message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSeq {
    /// Not bound to an invite yet (outgoing call before the server acknowledged it)
    Unassigned,
    /// Bound to the invite with this seq
    Assigned(NonZeroU32),
}

impl CallSeq {
    /// Numeric value, 0 when unassigned
    pub fn value(&self) -> u32 {
        match self {
            CallSeq::Unassigned => 0,
            CallSeq::Assigned(seq) => seq.get(),
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, CallSeq::Assigned(_))
    }
}

impl fmt::Display for CallSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSeq::Unassigned => f.write_str("unassigned"),
            CallSeq::Assigned(seq) => write!(f, "{}", seq),
        }
    }
}

/// The call currently in progress
pub struct CallSession {
    topic: String,
    connection: Arc<dyn CallConnection>,
    seq: Mutex<CallSeq>,
    ended: AtomicBool,
}

impl CallSession {
    /// Create a session for `topic` owning `connection`. The seq starts unassigned.
    pub fn new(topic: impl Into<String>, connection: Arc<dyn CallConnection>) -> Self {
        Self {
            topic: topic.into(),
            connection,
            seq: Mutex::new(CallSeq::Unassigned),
            ended: AtomicBool::new(false),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn seq(&self) -> CallSeq {
        *self.seq.lock()
    }

    pub fn connection(&self) -> &Arc<dyn CallConnection> {
        &self.connection
    }

    /// Bind the session to invite `seq` and mark the connection active.
    ///
    /// Succeeds when the seq is still unassigned, or when the same
    /// `(topic, seq)` is applied again. Binding an already bound session to a
    /// different call returns [`CallError::InvalidSessionState`].
    pub async fn set_call_active(&self, topic: &str, seq: u32) -> CallResult<()> {
        let new_seq = NonZeroU32::new(seq).ok_or(CallError::InvalidSequence { seq: seq as i64 })?;

        {
            let mut current = self.seq.lock();
            match *current {
                CallSeq::Unassigned => {
                    if topic != self.topic {
                        warn!(session_topic = %self.topic, topic, seq, "Binding seq announced for another topic");
                    }
                    *current = CallSeq::Assigned(new_seq);
                }
                CallSeq::Assigned(existing) if existing == new_seq && topic == self.topic => {
                    debug!(topic, seq, "Call already active");
                }
                CallSeq::Assigned(existing) => {
                    return Err(CallError::invalid_session_state(&self.topic, topic, existing.get()));
                }
            }
        }

        self.connection.set_active().await;
        Ok(())
    }

    /// End the call: disconnect the connection with a local cause and release it.
    ///
    /// Only the first call has an effect; returns whether this call ended the session.
    pub async fn end_call(&self) -> bool {
        if self.ended.swap(true, Ordering::SeqCst) {
            return false;
        }

        let state = self.connection.state().await;
        if !state.is_disconnected() {
            self.connection.set_disconnected(DisconnectCause::Local).await;
            self.connection.destroy().await;
        }
        debug!(topic = %self.topic, seq = %self.seq(), "Call ended");
        true
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Whether this session is the call `(topic, seq)`. Topic comparison is case-sensitive.
    pub fn matches(&self, topic: &str, seq: u32) -> bool {
        self.topic == topic && self.seq().value() == seq
    }

    /// Whether a signal about call `(topic, seq)` is about this session.
    ///
    /// Like [`matches`](Self::matches), except that a session without a seq yet
    /// accepts any seq on its own topic.
    pub fn pertains_to(&self, topic: &str, seq: u32) -> bool {
        if self.topic != topic {
            return false;
        }
        match self.seq() {
            CallSeq::Unassigned => true,
            CallSeq::Assigned(assigned) => assigned.get() == seq,
        }
    }

    /// Connection reached the active state
    pub async fn is_connected(&self) -> bool {
        self.connection.state().await == ConnectionState::Active
    }

    /// Current audio route, when routing is owned by the telephony framework
    pub async fn audio_route(&self) -> Option<CallAudioRoute> {
        if !self.connection.supports_audio_routing() {
            return None;
        }
        self.connection.audio_route().await
    }

    pub async fn set_audio_route(&self, route: CallAudioRoute) -> bool {
        if !self.connection.supports_audio_routing() {
            return false;
        }
        self.connection.set_audio_route(route).await
    }
}

impl fmt::Debug for CallSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSession")
            .field("topic", &self.topic)
            .field("seq", &self.seq())
            .field("ended", &self.is_ended())
            .finish()
    }
}
