//! Audio routing and focus types shared by the policy and the platform trait

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform audio mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioMode {
    /// Regular media playback
    Normal,
    /// Ringtone is playing
    Ringtone,
    /// A telephony call is in progress
    InCall,
    /// VoIP or other two-way communication
    InCommunication,
}

/// Audio route of a telephony-managed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallAudioRoute {
    Earpiece,
    Bluetooth,
    WiredHeadset,
    Speaker,
    Streaming,
}

impl fmt::Display for CallAudioRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallAudioRoute::Earpiece => "earpiece",
            CallAudioRoute::Bluetooth => "bluetooth",
            CallAudioRoute::WiredHeadset => "wired-headset",
            CallAudioRoute::Speaker => "speaker",
            CallAudioRoute::Streaming => "streaming",
        };
        f.write_str(name)
    }
}

/// Kind of an output audio device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputDeviceType {
    BuiltinEarpiece,
    BuiltinSpeaker,
    WiredHeadset,
    BluetoothSco,
    BluetoothA2dp,
    Usb,
    Other,
}

/// An output device as enumerated by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDevice {
    /// Platform device identifier
    pub id: u32,
    /// Device kind
    pub device_type: OutputDeviceType,
    /// Human-readable product name, if reported
    pub name: Option<String>,
}

impl OutputDevice {
    pub fn new(id: u32, device_type: OutputDeviceType) -> Self {
        Self { id, device_type, name: None }
    }

    pub fn is_builtin_speaker(&self) -> bool {
        self.device_type == OutputDeviceType::BuiltinSpeaker
    }
}

/// What the platform audio stack is able to do
///
/// Detected once at startup and used to select the output routing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCapabilities {
    /// Platform offers explicit communication-device selection
    pub communication_device_selection: bool,
}

impl AudioCapabilities {
    /// Platform with communication-device selection
    pub fn modern() -> Self {
        Self { communication_device_selection: true }
    }

    /// Platform with only the boolean speakerphone toggle
    pub fn legacy() -> Self {
        Self { communication_device_selection: false }
    }
}

impl Default for AudioCapabilities {
    fn default() -> Self {
        Self::modern()
    }
}

/// Focus gain requested from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusGain {
    Gain,
    GainTransient,
    GainTransientMayDuck,
    GainTransientExclusive,
}

/// Audio attribute usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioUsage {
    Media,
    VoiceCommunication,
    NotificationRingtone,
}

/// Audio attribute content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioContentType {
    Speech,
    Music,
    Sonification,
}

/// An audio focus request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusRequest {
    pub gain: FocusGain,
    pub usage: AudioUsage,
    pub content_type: AudioContentType,
    pub accepts_delayed_focus_gain: bool,
    pub will_pause_when_ducked: bool,
}

impl FocusRequest {
    /// Focus request for a two-way voice call: speech over the voice
    /// communication stream, no delayed grant and no automatic ducking.
    pub fn voice_communication() -> Self {
        Self {
            gain: FocusGain::Gain,
            usage: AudioUsage::VoiceCommunication,
            content_type: AudioContentType::Speech,
            accepts_delayed_focus_gain: false,
            will_pause_when_ducked: false,
        }
    }
}

/// Outcome of a focus request or abandon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusResult {
    Granted,
    Failed,
    Delayed,
    /// Platform returned a code this crate does not know
    Unknown(i32),
}

impl fmt::Display for FocusResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusResult::Granted => write!(f, "AUDIOFOCUS_REQUEST_GRANTED"),
            FocusResult::Failed => write!(f, "AUDIOFOCUS_REQUEST_FAILED"),
            FocusResult::Delayed => write!(f, "AUDIOFOCUS_REQUEST_DELAYED"),
            FocusResult::Unknown(code) => write!(f, "AUDIOFOCUS_REQUEST_UNKNOWN({})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_focus_request_attributes() {
        let request = FocusRequest::voice_communication();
        assert_eq!(request.gain, FocusGain::Gain);
        assert_eq!(request.usage, AudioUsage::VoiceCommunication);
        assert_eq!(request.content_type, AudioContentType::Speech);
        assert!(!request.accepts_delayed_focus_gain);
        assert!(!request.will_pause_when_ducked);
    }

    #[test]
    fn test_capabilities_deserialize() {
        let caps: AudioCapabilities =
            serde_json::from_str(r#"{"communication_device_selection":false}"#).unwrap();
        assert_eq!(caps, AudioCapabilities::legacy());
    }

    #[test]
    fn test_focus_result_display() {
        assert_eq!(FocusResult::Delayed.to_string(), "AUDIOFOCUS_REQUEST_DELAYED");
        assert_eq!(FocusResult::Unknown(7).to_string(), "AUDIOFOCUS_REQUEST_UNKNOWN(7)");
    }
}
