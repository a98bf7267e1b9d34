//! Audio control policy
//!
//! [`AudioControl`] is the single place that decides how to switch the
//! speakerphone and how to hold audio focus. Every platform failure is logged
//! and degraded into a `false` or no-op result; nothing here returns an error.
//!
//! # Routing decision
//!
//! ```text
//! set_speakerphone_on(enable)
//!   │
//!   ├── call owns the route? ──yes──► CallRouteProvider::set_call_audio_route
//!   │                                  (save / restore previous route)
//!   └── no ──► request focus ─► set mode ─► OutputRouting strategy
//! ```

use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::platform::{select_output_routing, AudioService, OutputRouting};
use crate::types::{AudioMode, CallAudioRoute, FocusRequest, FocusResult};

/// Access to the audio route of the call currently managed by telephony
///
/// Implemented by the call registry. When `is_call_useful` is `false` the
/// platform audio service is driven directly instead.
#[async_trait]
pub trait CallRouteProvider: Send + Sync {
    /// Whether a telephony-managed call currently owns the audio route
    async fn is_call_useful(&self) -> bool;

    /// Current route of that call
    async fn call_audio_route(&self) -> Option<CallAudioRoute>;

    /// Ask the call to switch route. Returns whether the request was accepted.
    async fn set_call_audio_route(&self, route: CallAudioRoute) -> bool;
}

/// Provider for processes that never have telephony-managed calls
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCallRouting;

#[async_trait]
impl CallRouteProvider for NoCallRouting {
    async fn is_call_useful(&self) -> bool {
        false
    }

    async fn call_audio_route(&self) -> Option<CallAudioRoute> {
        None
    }

    async fn set_call_audio_route(&self, _route: CallAudioRoute) -> bool {
        false
    }
}

/// Snapshot of the routing state owned by [`AudioControl`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioRouteState {
    /// Last speakerphone state successfully applied
    pub speakerphone_on: bool,
    /// Audio focus is currently granted to us
    pub focus_held: bool,
    /// Call route saved when the speaker was switched on, restored when switched off
    pub saved_call_route: Option<CallAudioRoute>,
}

#[derive(Debug, Default)]
struct ControlState {
    route: AudioRouteState,
    focus_request: Option<FocusRequest>,
}

/// Speakerphone and audio focus policy
pub struct AudioControl {
    audio: Arc<dyn AudioService>,
    routing: Arc<dyn OutputRouting>,
    calls: Arc<dyn CallRouteProvider>,
    state: Mutex<ControlState>,
}

impl AudioControl {
    /// Create the policy. The output routing strategy is selected here, once,
    /// from the audio service's capabilities.
    pub fn new(audio: Arc<dyn AudioService>, calls: Arc<dyn CallRouteProvider>) -> Self {
        let routing = select_output_routing(audio.capabilities());
        debug!(strategy = routing.name(), "Audio output routing selected");
        Self::with_routing(audio, calls, routing)
    }

    /// Create the policy with an explicit routing strategy
    pub fn with_routing(
        audio: Arc<dyn AudioService>,
        calls: Arc<dyn CallRouteProvider>,
        routing: Arc<dyn OutputRouting>,
    ) -> Self {
        Self {
            audio,
            routing,
            calls,
            state: Mutex::new(ControlState::default()),
        }
    }

    /// Underlying platform audio service
    pub fn audio_service(&self) -> &Arc<dyn AudioService> {
        &self.audio
    }

    /// Name of the active output routing strategy
    pub fn routing_strategy(&self) -> &'static str {
        self.routing.name()
    }

    pub async fn set_mode(&self, mode: AudioMode) {
        if let Err(e) = self.audio.set_mode(mode).await {
            warn!(error = %e, ?mode, "Failed to set audio mode");
        }
    }

    pub async fn set_microphone_mute(&self, mute: bool) {
        if let Err(e) = self.audio.set_microphone_mute(mute).await {
            warn!(error = %e, mute, "Failed to set microphone mute");
        }
    }

    /// Turn the speakerphone on or off.
    ///
    /// Returns `true` if the change was applied (or nothing had to change).
    pub async fn set_speakerphone_on(&self, enable: bool) -> bool {
        let call_route = if self.calls.is_call_useful().await {
            self.calls.call_audio_route().await
        } else {
            None
        };

        let done = match call_route {
            Some(route) => self.set_call_speaker(route, enable).await,
            None => self.set_device_speaker(enable).await,
        };

        if done {
            self.state.lock().await.route.speakerphone_on = enable;
        } else {
            warn!(enable, "Failed to set speakerphone");
        }
        done
    }

    async fn set_call_speaker(&self, current: CallAudioRoute, enable: bool) -> bool {
        let mut state = self.state.lock().await;
        if enable {
            if current == CallAudioRoute::Speaker {
                return true;
            }
            state.route.saved_call_route = Some(current);
            debug!(saved = %current, "Routing call audio to speaker");
            return self.calls.set_call_audio_route(CallAudioRoute::Speaker).await;
        }

        if current != CallAudioRoute::Speaker {
            return true;
        }
        let restore = state.route.saved_call_route.take().unwrap_or(CallAudioRoute::Earpiece);
        debug!(restore = %restore, "Restoring call audio route");
        self.calls.set_call_audio_route(restore).await
    }

    async fn set_device_speaker(&self, enable: bool) -> bool {
        self.request_audio_focus().await;
        self.set_mode(if enable { AudioMode::InCommunication } else { AudioMode::Normal }).await;
        self.routing.set_speaker(self.audio.as_ref(), enable).await
    }

    /// Whether audio currently goes to the speakerphone
    pub async fn is_speakerphone_on(&self) -> bool {
        if self.calls.is_call_useful().await {
            if let Some(route) = self.calls.call_audio_route().await {
                return route == CallAudioRoute::Speaker;
            }
        }
        self.routing.is_speaker_on(self.audio.as_ref()).await
    }

    /// Acquire audio focus for voice communication. Does nothing if focus is already held.
    pub async fn request_audio_focus(&self) {
        let mut state = self.state.lock().await;
        if state.route.focus_held {
            return;
        }

        let request = state
            .focus_request
            .get_or_insert_with(FocusRequest::voice_communication)
            .clone();

        match self.audio.request_audio_focus(&request).await {
            FocusResult::Granted => {
                state.route.focus_held = true;
                info!("Audio focus granted");
            }
            status => warn!(%status, "requestAudioFocus failed"),
        }
    }

    /// Release audio focus. Does nothing if focus was never granted.
    pub async fn abandon_audio_focus(&self) {
        let mut state = self.state.lock().await;
        if !state.route.focus_held {
            return;
        }
        let Some(request) = state.focus_request.clone() else {
            return;
        };

        match self.audio.abandon_audio_focus(&request).await {
            FocusResult::Granted => {
                state.route.focus_held = false;
                info!("Audio focus abandoned");
            }
            status => warn!(%status, "abandonAudioFocus failed"),
        }
    }

    /// Current routing state, for reflecting toggle state in the UI
    pub async fn route_state(&self) -> AudioRouteState {
        self.state.lock().await.route.clone()
    }
}
