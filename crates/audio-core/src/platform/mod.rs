//! Platform audio service abstraction
//!
//! [`AudioService`] is the seam to the operating system's audio manager. It
//! covers audio focus, the audio mode, microphone mute and both generations of
//! output selection (explicit communication device and the legacy speakerphone
//! toggle). Which generation is used is decided once by [`select_output_routing`].

use std::sync::Arc;
use async_trait::async_trait;

use crate::error::AudioResult;
use crate::types::{AudioCapabilities, AudioMode, FocusRequest, FocusResult, OutputDevice};

pub mod mock;
pub mod routing;

pub use routing::{CommunicationDeviceRouting, LegacySpeakerRouting};

/// Platform audio manager
#[async_trait]
pub trait AudioService: Send + Sync {
    /// Capabilities of this platform's audio stack
    fn capabilities(&self) -> AudioCapabilities;

    async fn set_mode(&self, mode: AudioMode) -> AudioResult<()>;

    async fn set_microphone_mute(&self, mute: bool) -> AudioResult<()>;

    async fn request_audio_focus(&self, request: &FocusRequest) -> FocusResult;

    async fn abandon_audio_focus(&self, request: &FocusRequest) -> FocusResult;

    /// Enumerate output devices
    async fn output_devices(&self) -> AudioResult<Vec<OutputDevice>>;

    /// Select an explicit communication device. Returns whether the platform accepted it.
    async fn set_communication_device(&self, device: &OutputDevice) -> AudioResult<bool>;

    /// Clear the explicit communication device, reverting to default routing
    async fn clear_communication_device(&self) -> AudioResult<()>;

    /// Currently selected communication device, if any
    async fn communication_device(&self) -> AudioResult<Option<OutputDevice>>;

    /// Legacy speakerphone toggle
    async fn set_speakerphone_on(&self, on: bool) -> AudioResult<()>;

    /// Legacy speakerphone flag
    async fn is_speakerphone_on(&self) -> AudioResult<bool>;
}

/// Strategy for routing output to (or away from) the built-in speaker
/// when no telephony call owns the audio route.
#[async_trait]
pub trait OutputRouting: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Route output to the speaker (`true`) or back to default routing
    async fn set_speaker(&self, audio: &dyn AudioService, enable: bool) -> bool;

    /// Whether output currently goes to the speaker
    async fn is_speaker_on(&self, audio: &dyn AudioService) -> bool;
}

/// Pick the output routing strategy for the given capabilities
pub fn select_output_routing(capabilities: AudioCapabilities) -> Arc<dyn OutputRouting> {
    if capabilities.communication_device_selection {
        Arc::new(CommunicationDeviceRouting)
    } else {
        Arc::new(LegacySpeakerRouting)
    }
}
