//! Process-wide call registry
//!
//! At most one call is in progress per process. [`CallRegistry`] is the single
//! owner of that call: it holds the current [`CallSession`] behind an async
//! mutex, so the UI, the hang-up receiver and push handling can all reach it
//! from any task without racing each other.
//!
//! The registry is also the [`CallRouteProvider`] used by
//! [`AudioControl`](rcall_audio_core::AudioControl): while the current call's
//! connection owns the audio route, speakerphone changes go through it.
//!
//! ```rust
//! use std::sync::Arc;
//! use rcall_call_core::CallRegistry;
//! use rcall_call_core::platform::InAppConnection;
//!
//! # tokio_test::block_on(async {
//! let registry = CallRegistry::new();
//! registry.prepare_new_call("grp1", Arc::new(InAppConnection::new())).await.unwrap();
//! registry.set_call_active("grp1", 42).await.unwrap();
//! assert!(registry.current().await.unwrap().matches("grp1", 42));
//!
//! registry.end_call_in_progress().await;
//! assert!(registry.current().await.is_none());
//! # });
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use rcall_audio_core::{CallAudioRoute, CallRouteProvider};

use crate::call::CallSession;
use crate::error::{CallError, CallResult};
use crate::events::CallEvent;
use crate::platform::CallConnection;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Single owner of the call in progress
pub struct CallRegistry {
    current: Mutex<Option<Arc<CallSession>>>,
    events: broadcast::Sender<CallEvent>,
}

impl CallRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            current: Mutex::new(None),
            events,
        }
    }

    /// Subscribe to session lifecycle events
    pub fn subscribe_events(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: CallEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Create the session for a new call.
    ///
    /// Fails with [`CallError::CallAlreadyInProgress`] while another call is live.
    pub async fn prepare_new_call(
        &self,
        topic: &str,
        connection: Arc<dyn CallConnection>,
    ) -> CallResult<Arc<CallSession>> {
        let mut current = self.current.lock().await;
        if let Some(existing) = current.as_ref() {
            if !existing.is_ended() {
                warn!(current = %existing.topic(), requested = topic, "Call already in progress");
                return Err(CallError::CallAlreadyInProgress {
                    topic: existing.topic().to_string(),
                });
            }
        }

        let session = Arc::new(CallSession::new(topic, connection));
        *current = Some(session.clone());
        drop(current);

        info!(topic, "New call session prepared");
        self.publish(CallEvent::prepared(topic, 0));
        Ok(session)
    }

    /// The live call session, if any
    pub async fn current(&self) -> Option<Arc<CallSession>> {
        self.current
            .lock()
            .await
            .as_ref()
            .filter(|s| !s.is_ended())
            .cloned()
    }

    pub async fn is_call_in_progress(&self) -> bool {
        self.current().await.is_some()
    }

    /// Bind the current session to `(topic, seq)` and mark it active
    pub async fn set_call_active(&self, topic: &str, seq: u32) -> CallResult<()> {
        let session = self.current().await.ok_or(CallError::NoCallInProgress)?;
        session.set_call_active(topic, seq).await?;
        self.publish(CallEvent::active(session.topic(), seq));
        Ok(())
    }

    /// End the current call and release its connection.
    ///
    /// Safe to call when no call is in progress or concurrently; only the
    /// first caller ends the session. Returns whether a session was ended.
    pub async fn end_call_in_progress(&self) -> bool {
        let session = self.current.lock().await.take();
        let Some(session) = session else {
            debug!("No call in progress to end");
            return false;
        };
        self.finish(session).await
    }

    /// End the call in progress only if it is the call `(topic, seq)`.
    ///
    /// A session that has no seq yet is ended for any seq on its topic.
    /// Returns whether a session was ended.
    pub async fn end_call_for(&self, topic: &str, seq: u32) -> bool {
        let session = {
            let mut current = self.current.lock().await;
            let pertains = current.as_ref().is_some_and(|s| s.pertains_to(topic, seq));
            if pertains { current.take() } else { None }
        };
        let Some(session) = session else {
            debug!(topic, seq, "No call in progress for this signal");
            return false;
        };
        self.finish(session).await
    }

    async fn finish(&self, session: Arc<CallSession>) -> bool {
        if session.end_call().await {
            info!(topic = %session.topic(), seq = %session.seq(), "Call in progress ended");
            self.publish(CallEvent::ended(session.topic(), session.seq().value()));
            true
        } else {
            false
        }
    }

    /// Forget the current session without touching its connection
    ///
    /// For when the platform already tore the connection down.
    pub async fn unregister_call_in_progress(&self) {
        if let Some(session) = self.current.lock().await.take() {
            debug!(topic = %session.topic(), "Call in progress unregistered");
        }
    }
}

impl Default for CallRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallRouteProvider for CallRegistry {
    async fn is_call_useful(&self) -> bool {
        let Some(session) = self.current().await else {
            return false;
        };
        if !session.connection().supports_audio_routing() {
            return false;
        }
        !session.connection().state().await.is_disconnected()
    }

    async fn call_audio_route(&self) -> Option<CallAudioRoute> {
        self.current().await?.audio_route().await
    }

    async fn set_call_audio_route(&self, route: CallAudioRoute) -> bool {
        match self.current().await {
            Some(session) => session.set_audio_route(route).await,
            None => false,
        }
    }
}
