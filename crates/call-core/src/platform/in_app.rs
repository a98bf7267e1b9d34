//! Connection used when a call bypasses the telephony framework
//!
//! Tracks the connection state in-process. Audio routing is not delegated to
//! telephony for these calls, so `AudioControl` drives the audio service
//! directly while one of them is in progress.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use rcall_audio_core::CallAudioRoute;

use super::CallConnection;
use crate::types::{ConnectionState, DisconnectCause};

#[derive(Debug)]
struct InAppState {
    state: ConnectionState,
    cause: Option<DisconnectCause>,
    destroyed: bool,
}

/// In-process call connection
#[derive(Debug)]
pub struct InAppConnection {
    inner: Mutex<InAppState>,
}

impl InAppConnection {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(InAppState {
                state: ConnectionState::New,
                cause: None,
                destroyed: false,
            }),
        }
    }

    pub fn disconnect_cause(&self) -> Option<DisconnectCause> {
        self.inner.lock().cause
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }
}

impl Default for InAppConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallConnection for InAppConnection {
    async fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    async fn set_active(&self) {
        let mut inner = self.inner.lock();
        if !inner.state.is_disconnected() {
            inner.state = ConnectionState::Active;
        }
    }

    async fn set_disconnected(&self, cause: DisconnectCause) {
        let mut inner = self.inner.lock();
        inner.state = ConnectionState::Disconnected;
        inner.cause = Some(cause);
    }

    async fn destroy(&self) {
        debug!("In-app connection destroyed");
        self.inner.lock().destroyed = true;
    }

    fn supports_audio_routing(&self) -> bool {
        false
    }

    async fn audio_route(&self) -> Option<CallAudioRoute> {
        None
    }

    async fn set_audio_route(&self, _route: CallAudioRoute) -> bool {
        false
    }
}
